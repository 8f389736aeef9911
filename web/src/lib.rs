//! The admin HTTP surface (spec.md §6). Grounded on the teacher's own
//! `main.rs` for the actix-web server shape (`HttpServer::new` building an
//! `App` per worker, `middleware::Logger`), generalized from a standalone
//! binary into an [`AdminServer`] implementing `common::server::Server` so
//! the root binary can register it with a [`common::server::ShutdownHandle`]
//! alongside the replication controller.

pub mod admin;

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{middleware, web, App, HttpServer};

use cdc_core::controller::Controller;
use common::err::{CdcError, ErrorKind};
use common::server::Server;

const PKG: &str = "web";

/// Read-header timeout for admin requests (spec.md §6 default).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Wraps a bound-but-not-yet-running actix-web server so it fits
/// `common::server::Server`'s start/shutdown lifecycle. Binding happens
/// eagerly in [`AdminServer::bind`] so a port conflict is a construction
/// failure the caller can treat as fatal (spec.md §6 exit codes), rather
/// than a silent no-op inside `start`.
pub struct AdminServer {
    server: Option<actix_web::dev::Server>,
    handle: Option<ServerHandle>,
    join: Option<tokio::task::JoinHandle<std::io::Result<()>>>,
}

impl AdminServer {
    pub fn bind(addr: &str, controller: Arc<Controller>) -> Result<Self, CdcError> {
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(controller.clone()))
                .wrap(middleware::Logger::default())
                .service(
                    web::scope("/sync")
                        .route("/run", web::post().to(admin::run))
                        .route("/stop", web::post().to(admin::stop))
                        .route("/delete", web::post().to(admin::delete))
                        .route("/status", web::post().to(admin::status)),
                )
        })
        .client_request_timeout(REQUEST_TIMEOUT)
        .bind(addr)
        .map_err(|e| {
            CdcError::wrap(
                ErrorKind::Config,
                PKG,
                format!("fail to bind admin server at {}", addr),
                e,
            )
        })?
        .run();

        Ok(AdminServer {
            server: Some(server),
            handle: None,
            join: None,
        })
    }
}

#[async_trait::async_trait]
impl Server for AdminServer {
    async fn start(&mut self) {
        let Some(server) = self.server.take() else {
            return;
        };
        self.handle = Some(server.handle());
        self.join = Some(tokio::spawn(server));
    }

    async fn shutdown(&mut self, graceful: bool) -> Result<(), CdcError> {
        if let Some(handle) = self.handle.take() {
            handle.stop(graceful).await;
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
        Ok(())
    }
}

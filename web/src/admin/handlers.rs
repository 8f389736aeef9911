//! Handlers for the four `/sync` endpoints (spec.md §6). Grounded on
//! `original_source/handlers/http/*` (one handler function per route,
//! a `Controller` injected as shared state, a small JSON envelope on
//! every response) and on the teacher's `api::default` module for the
//! actix-web handler shape it replaces.

use std::sync::Arc;

use actix_web::{web, HttpResponse};

use cdc_core::controller::Controller;
use cdc_core::worker::WorkerParams;
use common::config::{DbConfig, DumpConfig};
use common::err::{CdcError, ErrorKind};

use super::dto::{
    ErrorResponse, RunRequest, RunResponse, ServerIdRequest, ServerIdResponse, StatusResponse,
    WorkerStatusDto,
};

/// `POST /sync/run` (spec.md §6: 200/400/500). Registers a worker and
/// starts it immediately; `start` itself only fails if the freshly
/// allocated id has vanished from the registry, which cannot happen here.
pub async fn run(controller: web::Data<Arc<Controller>>, body: web::Json<RunRequest>) -> HttpResponse {
    let req = body.into_inner();
    let params = WorkerParams {
        db: DbConfig {
            addr: req.addr,
            user: req.user,
            pass: req.pass,
            charset: req.charset,
            flavor: req.flavor,
        },
        dump: DumpConfig::default(),
        sources: req.sources,
        sink: req.sink_cfg,
    };

    let server_id = match controller.create(params).await {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    if let Err(e) = controller.start(server_id, false).await {
        return error_response(&e);
    }

    HttpResponse::Ok().json(RunResponse {
        server_id,
        msg: "started".into(),
    })
}

/// `POST /sync/stop` (spec.md §6: 200/400).
pub async fn stop(controller: web::Data<Arc<Controller>>, body: web::Json<ServerIdRequest>) -> HttpResponse {
    let server_id = body.server_id;
    match controller.stop(server_id).await {
        Ok(()) => HttpResponse::Ok().json(ServerIdResponse {
            server_id,
            msg: "stopped".into(),
        }),
        Err(e) => error_response(&e),
    }
}

/// `POST /sync/delete` (spec.md §6: 200/400).
pub async fn delete(controller: web::Data<Arc<Controller>>, body: web::Json<ServerIdRequest>) -> HttpResponse {
    let server_id = body.server_id;
    match controller.remove(server_id).await {
        Ok(()) => HttpResponse::Ok().json(ServerIdResponse {
            server_id,
            msg: "deleted".into(),
        }),
        Err(e) => error_response(&e),
    }
}

/// `POST /sync/status` (spec.md §6: 200, no failure mode of its own).
pub async fn status(controller: web::Data<Arc<Controller>>) -> HttpResponse {
    let statuses = controller
        .status()
        .await
        .into_iter()
        .map(|(id, status)| {
            (
                id,
                WorkerStatusDto {
                    server_id: status.server_id,
                    is_running: status.is_running,
                    sources: status.sources,
                },
            )
        })
        .collect();

    HttpResponse::Ok().json(StatusResponse { statuses })
}

/// spec.md §7: `ParamError` (unknown id, bad request shape) maps to 400;
/// everything else — construction failures the controller surfaces
/// verbatim (`ConfigError`, `QueryError`, `BinlogError`, ...) — maps to
/// 500, carrying the error's message in the body.
fn error_response(err: &CdcError) -> HttpResponse {
    let body = ErrorResponse {
        msg: err.to_string(),
    };
    match err.kind {
        ErrorKind::Param => HttpResponse::BadRequest().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

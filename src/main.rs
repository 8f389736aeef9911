//! Process entry point (spec.md §6): loads the TOML config, wires the
//! replication controller to the admin HTTP surface, and waits for a
//! termination signal before shutting both down in order.
//!
//! Grounded on `binlog_cli/src/main.rs` for the `clap`-driven CLI shape
//! (`--config`/`--debug`) and on `original_source/app/main.go` +
//! `tools/env/constants.go` for the env-var names and `ENV=TEST` vs
//! `ENV=PROD` logging split.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use cdc_core::controller::{Controller, ControllerDeps};
use cdc_core::decoder::fake::FakeDecoderFactory;
use cdc_core::id_generator::GlobalIdGenerator;
use cdc_core::source::FakeSchemaInspector;
use cdc_core::worker::WorkerParams;
use common::config::{AppConfig, SinkConfig};
use common::err::CdcResult;
use common::log::{OutputType, TracingFactory, TracingFactoryOptions};
use common::server::{Server, ShutdownHandle};

#[derive(Parser, Debug)]
#[command(name = "cdc-service")]
#[command(version = "0.0.2")]
#[command(about = "MySQL binlog CDC service")]
struct CliArgs {
    #[arg(short, long, help = "path to the TOML config file", value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "enable debug logging", default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let env = std::env::var("ENV").unwrap_or_else(|_| "PROD".into());
    let is_test = env == "TEST";
    let output_type = if is_test { OutputType::Stdout } else { OutputType::File };
    let log_opts = TracingFactoryOptions::new(args.debug || is_test, output_type, None);
    TracingFactory::init_log_with_options(log_opts);

    let service_name = std::env::var("SERVICE_NAME").unwrap_or_else(|_| "mysql-cdc".into());
    tracing::info!(service = %service_name, env = %env, "starting up");

    match run(args).await {
        Ok(()) => {
            tracing::info!("shutdown complete");
            std::process::exit(0);
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal startup failure");
            std::process::exit(1);
        }
    }
}

async fn run(args: CliArgs) -> CdcResult<()> {
    let mut app_config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load("config.toml")?,
    };

    if let Ok(pass) = std::env::var("DATABASE_PASS") {
        app_config.db.pass = pass;
    }

    let domain = std::env::var("DOMAIN").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".into());

    let deps = ControllerDeps {
        id_gen: Box::new(GlobalIdGenerator::new()),
        // Schema metadata lookups and the real binlog stream are both
        // external collaborators out of scope for this service (spec.md
        // §1, §5): a production deployment plugs a live
        // `information_schema`-backed `SchemaInspector` and a real
        // `DecoderFactory` in here.
        inspector: Box::new(FakeSchemaInspector::new()),
        decoder_factory: Box::new(FakeDecoderFactory::new(vec![])),
        save_dir: PathBuf::from("./run/save"),
        log_dir: PathBuf::from("./run/log"),
    };
    let controller = Arc::new(Controller::new(deps));

    if !app_config.sources.is_empty() {
        let params = WorkerParams {
            db: app_config.db.clone(),
            dump: app_config.dump.clone(),
            sources: app_config.sources.clone(),
            sink: SinkConfig::Log,
        };
        let server_id = controller.create(params).await?;
        controller.start(server_id, false).await?;
        tracing::info!(server_id, "started worker from config file sources");
    }

    let mut admin = web::AdminServer::bind(&format!("{}:{}", domain, port), controller.clone())?;
    admin.start().await;
    tracing::info!(%domain, %port, "admin HTTP server listening");

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining workers");

    let mut shutdown = ShutdownHandle::create();
    shutdown.add_service(Box::new(admin));

    shutdown.shutdown_services(true).await?;
    controller.close().await?;

    Ok(())
}

/// Waits for SIGINT, SIGTERM, or SIGQUIT (spec.md §6 exit codes).
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("fail to register SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("fail to register SIGTERM handler");
    let mut sigquit = signal(SignalKind::quit()).expect("fail to register SIGQUIT handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
        _ = sigquit.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

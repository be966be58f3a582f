//! `hookshot` server binary.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use hookshot_server::cli::ServerArgs;
use hookshot_server::hooks::{builtin_registry, LogMailer};
use hookshot_server::telemetry::{enable_error_backtraces, init_logging, install_metrics};
use hookshot_server::{Dispatcher, ExceptionReporter, NetworkModule};

fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    enable_error_backtraces();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(run(args))
}

async fn run(args: ServerArgs) -> anyhow::Result<()> {
    init_logging(args.log_format)?;

    if let Some(addr) = args.metrics_addr {
        install_metrics(addr).context("failed to start metrics exporter")?;
    }

    let registry = builtin_registry(&args.hooks_config(), Arc::new(LogMailer))
        .context("failed to register services")?;
    let reporter = ExceptionReporter::from_config(&args.reporter_config())
        .context("failed to configure exception reporter")?;
    let dispatcher = Dispatcher::new(
        Arc::new(registry),
        Arc::new(reporter),
        args.dispatch_config(),
    );

    let mut network = NetworkModule::new(args.network_config(), Arc::new(dispatcher));
    let port = network.start().await?;
    info!(port, "hookshot started");

    network.serve(shutdown_signal()).await?;
    info!("hookshot stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => error!(error = %err, "failed to listen for ctrl-c; shutting down"),
    }
}

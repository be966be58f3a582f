//! Logging and metrics setup for the `hookshot` binary.

use std::net::SocketAddr;

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Dispatches by service and response status.
pub const REQUESTS_TOTAL: &str = "hookshot_requests_total";
/// Time spent inside a service's `receive`.
pub const HOOK_DURATION_SECONDS: &str = "hookshot_hook_duration_seconds";
/// Calls over the slow-hook threshold.
pub const SLOW_HOOKS_TOTAL: &str = "hookshot_slow_hooks_total";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer()).try_init()?,
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
    }
    Ok(())
}

/// Turns on backtrace capture for `anyhow` errors unless the environment
/// already decides it, so unclassified failures are reported with the
/// frames that raised them.
///
/// Reads and writes the process environment: call before any thread is
/// spawned.
pub fn enable_error_backtraces() {
    let decided = ["RUST_LIB_BACKTRACE", "RUST_BACKTRACE"]
        .iter()
        .any(|var| std::env::var_os(var).is_some());
    if !decided {
        std::env::set_var("RUST_LIB_BACKTRACE", "1");
    }
}

/// Installs the Prometheus recorder with a scrape listener on `addr`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error if the recorder is already installed or the listener
/// cannot be started.
pub fn install_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(REQUESTS_TOTAL, "Webhook dispatches by service and status");
    describe_histogram!(HOOK_DURATION_SECONDS, "Duration of service hook calls in seconds");
    describe_counter!(SLOW_HOOKS_TOTAL, "Service hook calls over the slow-hook threshold");

    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

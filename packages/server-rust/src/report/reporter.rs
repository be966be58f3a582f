use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use hookshot_core::{HookError, HookService};
use regex::Regex;
use tracing::{error, info};

use super::config::ReporterConfig;
use super::exception::{ExceptionReport, ReportContext};
use super::sink::{CollectorSink, LocalSink, ReportSink};

/// Boot-time reporter configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("invalid production host pattern: {0}")]
    HostPattern(#[from] regex::Error),
    #[error("failed to build collector client: {0}")]
    Client(#[source] anyhow::Error),
}

/// Fire-and-forget exception reporting.
///
/// `report` never fails: delivery errors, and panics inside the sink, are
/// logged locally and dropped. Nothing is retried.
pub struct ExceptionReporter {
    app: String,
    hostname: String,
    remote: bool,
    sink: Arc<dyn ReportSink>,
}

impl ExceptionReporter {
    /// Select the sink for this host: the collector when `hostname` matches
    /// the production pattern, the local diagnostic log otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ReporterError`] if the host pattern is not a valid regex or
    /// the collector client cannot be built.
    pub fn from_config(config: &ReporterConfig) -> Result<Self, ReporterError> {
        let pattern = Regex::new(&config.production_host_pattern)?;
        let remote = pattern.is_match(&config.hostname);
        let sink: Arc<dyn ReportSink> = if remote {
            info!(
                hostname = %config.hostname,
                collector = %config.collector_url,
                "exception reports go to collector"
            );
            Arc::new(
                CollectorSink::new(config.collector_url.clone(), config.collector_timeout)
                    .map_err(ReporterError::Client)?,
            )
        } else {
            info!(hostname = %config.hostname, "exception reports go to local log");
            Arc::new(LocalSink)
        };

        let mut reporter = Self::with_sink(config.app.clone(), config.hostname.clone(), sink);
        reporter.remote = remote;
        Ok(reporter)
    }

    /// Reporter delivering to an explicit sink.
    #[must_use]
    pub fn with_sink(
        app: impl Into<String>,
        hostname: impl Into<String>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            app: app.into(),
            hostname: hostname.into(),
            remote: false,
            sink,
        }
    }

    /// Whether reports are sent to the external collector.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Build and deliver a report for `error` raised by `service`.
    pub async fn report(
        &self,
        service: &dyn HookService,
        error: &HookError,
        ctx: &ReportContext<'_>,
    ) {
        let report = ExceptionReport::build(&self.app, &self.hostname, service, error, ctx);

        match AssertUnwindSafe(self.sink.deliver(&report)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(
                service = %report.service_name,
                class = %report.error_class,
                error = %err,
                "reporting exception failed"
            ),
            Err(_) => error!(
                service = %report.service_name,
                class = %report.error_class,
                "reporting exception panicked"
            ),
        }
    }
}

impl std::fmt::Debug for ExceptionReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionReporter")
            .field("app", &self.app)
            .field("hostname", &self.hostname)
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hookshot_core::{Mapping, ServiceHandle};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<ExceptionReport>>,
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn deliver(&self, report: &ExceptionReport) -> anyhow::Result<()> {
            self.reports.lock().push(report.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl ReportSink for FailingSink {
        async fn deliver(&self, _report: &ExceptionReport) -> anyhow::Result<()> {
            anyhow::bail!("collector unreachable")
        }
    }

    struct PanickingSink;

    #[async_trait]
    impl ReportSink for PanickingSink {
        async fn deliver(&self, _report: &ExceptionReport) -> anyhow::Result<()> {
            panic!("sink bug")
        }
    }

    struct Noop;

    #[async_trait]
    impl HookService for Noop {
        fn hook_name(&self) -> &'static str {
            "noop"
        }

        fn title(&self) -> &'static str {
            "Noop"
        }

        async fn receive(
            &self,
            _event: &str,
            _data: &Mapping,
            _payload: &Mapping,
        ) -> Result<Option<ServiceHandle>, HookError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn report_delivers_built_report() {
        let sink = Arc::new(RecordingSink::default());
        let reporter = ExceptionReporter::with_sink("app", "box1", sink.clone());

        let ctx = ReportContext {
            event: Some("push"),
            ..ReportContext::default()
        };
        reporter
            .report(&Noop, &HookError::from(anyhow::anyhow!("boom")), &ctx)
            .await;

        let reports = sink.reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].server, "box1");
        assert_eq!(reports[0].service_name, "noop");
        assert_eq!(reports[0].message, "boom");
        assert!(!reports[0].rollup_hash.is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let reporter = ExceptionReporter::with_sink("app", "box1", Arc::new(FailingSink));
        reporter
            .report(&Noop, &HookError::panicked("x"), &ReportContext::default())
            .await;
    }

    #[tokio::test]
    async fn sink_panic_is_swallowed() {
        let reporter = ExceptionReporter::with_sink("app", "box1", Arc::new(PanickingSink));
        reporter
            .report(&Noop, &HookError::panicked("x"), &ReportContext::default())
            .await;
    }

    #[test]
    fn production_host_selects_collector() {
        let config = ReporterConfig {
            hostname: "sh1.rs.github.com".to_string(),
            ..ReporterConfig::default()
        };
        let reporter = ExceptionReporter::from_config(&config).unwrap();
        assert!(reporter.is_remote());

        let config = ReporterConfig {
            hostname: "sh1.stg.github.com".to_string(),
            ..ReporterConfig::default()
        };
        assert!(ExceptionReporter::from_config(&config).unwrap().is_remote());
    }

    #[test]
    fn other_hosts_log_locally() {
        for host in ["localhost", "sh2.rs.github.com", "xsh1.rs.github.com.evil"] {
            let config = ReporterConfig {
                hostname: host.to_string(),
                ..ReporterConfig::default()
            };
            assert!(!ExceptionReporter::from_config(&config).unwrap().is_remote(), "{host}");
        }
    }

    #[test]
    fn invalid_host_pattern_is_rejected() {
        let config = ReporterConfig {
            production_host_pattern: "(unclosed".to_string(),
            ..ReporterConfig::default()
        };
        assert!(matches!(
            ExceptionReporter::from_config(&config),
            Err(ReporterError::HostPattern(_))
        ));
    }
}

//! Report destinations.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use super::exception::ExceptionReport;

/// Destination for exception reports.
#[async_trait]
pub trait ReportSink: Send + Sync + 'static {
    /// Deliver one report. Errors are logged by the caller and never retried.
    async fn deliver(&self, report: &ExceptionReport) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// CollectorSink
// ---------------------------------------------------------------------------

/// Posts reports to the external collector as a form body `json=<report>`.
///
/// The collector's response is ignored; only transport failures are errors.
#[derive(Debug, Clone)]
pub struct CollectorSink {
    url: String,
    client: reqwest::Client,
}

impl CollectorSink {
    /// Creates a sink posting to `url`, bounding each request by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReportSink for CollectorSink {
    async fn deliver(&self, report: &ExceptionReport) -> anyhow::Result<()> {
        let json = serde_json::to_string(report)?;
        let response = self
            .client
            .post(&self.url)
            .form(&[("json", json)])
            .send()
            .await?;
        debug!(status = %response.status(), rollup = %report.rollup_hash, "exception report sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LocalSink
// ---------------------------------------------------------------------------

/// Writes reports to the local diagnostic log instead of the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSink;

#[async_trait]
impl ReportSink for LocalSink {
    async fn deliver(&self, report: &ExceptionReport) -> anyhow::Result<()> {
        error!(
            service = %report.service_name,
            class = %report.error_class,
            rollup = %report.rollup_hash,
            duration = report.duration.as_deref(),
            backtrace = %report.backtrace(),
            "{}",
            report.message
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! The `web` hook: forwards the event payload to a user-configured URL.
//!
//! This is the diagnostic service. The dispatcher exempts it from slow-hook
//! reports, and its own `data`/`payload` may appear in exception reports.

use std::time::Duration;

use async_trait::async_trait;
use hookshot_core::event::data_str;
use hookshot_core::{HookError, HookService, Mapping, ServiceHandle};
use reqwest::{StatusCode, Url};
use serde_json::Value;

/// Default bound on one outbound delivery.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs each event to `data.url`, as JSON when `data.content_type` is
/// `"json"` and as a `payload=<json>` form otherwise.
#[derive(Debug, Clone)]
pub struct WebService {
    client: reqwest::Client,
}

impl WebService {
    /// Creates the service with a per-delivery timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hookshot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HookService for WebService {
    fn hook_name(&self) -> &'static str {
        "web"
    }

    fn title(&self) -> &'static str {
        "Web"
    }

    fn is_diagnostic(&self) -> bool {
        true
    }

    async fn receive(
        &self,
        event: &str,
        data: &Mapping,
        payload: &Mapping,
    ) -> Result<Option<ServiceHandle>, HookError> {
        let raw_url = data_str(data, "url")
            .ok_or_else(|| HookError::configuration("Data 'url' is required"))?;
        let url = Url::parse(raw_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| HookError::configuration(format!("Invalid url: {raw_url}")))?;

        let body = Value::Object(payload.clone());
        let request = self
            .client
            .post(url.clone())
            .header("X-GitHub-Event", event);
        let request = if data_str(data, "content_type") == Some("json") {
            request.json(&body)
        } else {
            request.form(&[("payload", body.to_string())])
        };

        let response = request.send().await.map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => Ok(Some(ServiceHandle::ok())),
            StatusCode::NOT_FOUND => {
                Err(HookError::missing(format!("{url} returned 404 Not Found")))
            }
            status => Err(anyhow::anyhow!("{url} responded with {status}").into()),
        }
    }
}

fn transport_error(err: reqwest::Error) -> HookError {
    if err.is_timeout() {
        HookError::timeout(err.to_string())
    } else if err.is_connect() {
        HookError::connection_failed(err.to_string())
    } else {
        HookError::Unclassified(err.into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

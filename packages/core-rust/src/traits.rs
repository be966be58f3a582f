//! The service capability contract: what every hook service implements and
//! what it hands back to the dispatcher.

use std::borrow::Cow;

use async_trait::async_trait;

use crate::error::HookError;
use crate::event::Mapping;

/// Marker returned by a service that handled an event.
///
/// Only its presence matters to the dispatcher; the acknowledgement text
/// becomes the 200 response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    acknowledgement: Cow<'static, str>,
}

impl ServiceHandle {
    /// The standard `"OK"` acknowledgement.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            acknowledgement: Cow::Borrowed("OK"),
        }
    }

    /// A service-defined acknowledgement.
    #[must_use]
    pub fn with_acknowledgement(acknowledgement: impl Into<Cow<'static, str>>) -> Self {
        Self {
            acknowledgement: acknowledgement.into(),
        }
    }

    #[must_use]
    pub fn acknowledgement(&self) -> &str {
        &self.acknowledgement
    }
}

impl Default for ServiceHandle {
    fn default() -> Self {
        Self::ok()
    }
}

/// Capability contract every webhook service exposes to the dispatcher.
///
/// Services are registered once at boot and shared read-only across all
/// requests, so `receive` takes `&self`. Any lazily-initialized state a
/// service needs must live inside the instance behind interior mutability.
#[async_trait]
pub trait HookService: Send + Sync + 'static {
    /// Unique route segment (e.g. `"web"`). Two services must not share one.
    fn hook_name(&self) -> &'static str;

    /// Human-readable title returned by the discovery route.
    fn title(&self) -> &'static str;

    /// Whether this is the diagnostic service. Diagnostic services are
    /// exempt from slow-hook reports and may leak their own data into
    /// exception reports.
    fn is_diagnostic(&self) -> bool {
        false
    }

    /// Handle one event.
    ///
    /// Returns `Ok(None)` when the service does not respond to `event`.
    async fn receive(
        &self,
        event: &str,
        data: &Mapping,
        payload: &Mapping,
    ) -> Result<Option<ServiceHandle>, HookError>;
}

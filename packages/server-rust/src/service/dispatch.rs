//! Per-request dispatch pipeline.
//!
//! parse -> invoke -> classify -> (report). The outcome is fixed before any
//! report is built, so reporting can never change what the caller sees.

use std::sync::Arc;
use std::time::Duration;

use hookshot_core::{HookError, HookService};
use http::HeaderMap;
use metrics::{counter, histogram};
use tracing::{error, info, info_span, warn, Instrument};

use super::classify::{classify, classify_error};
use super::config::DispatchConfig;
use super::invoker::invoke;
use super::outcome::DispatchOutcome;
use super::parser::parse_request;
use super::registry::ServiceRegistry;
use crate::report::{ExceptionReporter, ReportContext};
use crate::telemetry::{HOOK_DURATION_SECONDS, REQUESTS_TOTAL, SLOW_HOOKS_TOTAL};

/// Message of the synthesized slow-hook failure.
pub const LONG_HOOK_MESSAGE: &str = "Long Service Hook";

/// Runs webhook requests through a registered service and reports failures.
///
/// Shared by every in-flight request; holds only read-only state.
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    reporter: Arc<ExceptionReporter>,
    config: DispatchConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        registry: Arc<ServiceRegistry>,
        reporter: Arc<ExceptionReporter>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            reporter,
            config,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn reporter(&self) -> &Arc<ExceptionReporter> {
        &self.reporter
    }

    /// Dispatch one event route request to `service`.
    ///
    /// Always produces an outcome: parse failures and every failure raised
    /// by the service are classified here. Unclassified failures are
    /// reported; a non-diagnostic call slower than the configured threshold
    /// is additionally reported as "Long Service Hook".
    pub async fn dispatch(
        &self,
        service: &dyn HookService,
        event_name: &str,
        headers: &HeaderMap,
        query: Option<&str>,
        body: &[u8],
    ) -> DispatchOutcome {
        let hook = service.hook_name();
        let span = info_span!(
            "hook",
            service = hook,
            event = event_name,
            status = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        async move {
            let event = match parse_request(event_name, headers, query, body) {
                Ok(event) => event,
                Err(err) => {
                    let err = HookError::from(err);
                    let outcome = classify_error(&err);
                    record_outcome(hook, &outcome, Duration::ZERO, Some(&err));
                    let ctx = ReportContext {
                        event: Some(event_name),
                        ..ReportContext::default()
                    };
                    self.reporter.report(service, &err, &ctx).await;
                    return outcome;
                }
            };

            let invocation = invoke(service, &event).await;
            let outcome = classify(hook, event_name, &invocation.result);
            record_outcome(hook, &outcome, invocation.duration, invocation.error());

            let ctx = ReportContext {
                event: Some(event_name),
                data: Some(&event.data),
                payload: Some(&event.payload),
                duration: None,
            };

            if let Some(err) = invocation.error().filter(|e| !e.is_classified()) {
                self.reporter.report(service, err, &ctx).await;
            }

            if self.is_slow(service, invocation.duration) {
                counter!(SLOW_HOOKS_TOTAL, "service" => hook).increment(1);
                warn!(
                    duration_secs = invocation.duration.as_secs_f64(),
                    "slow service hook"
                );
                let ctx = ReportContext {
                    duration: Some(invocation.duration),
                    ..ctx
                };
                match invocation.error() {
                    Some(err) => self.reporter.report(service, err, &ctx).await,
                    None => {
                        let err = HookError::timeout(LONG_HOOK_MESSAGE);
                        self.reporter.report(service, &err, &ctx).await;
                    }
                }
            }

            outcome
        }
        .instrument(span)
        .await
    }

    fn is_slow(&self, service: &dyn HookService, duration: Duration) -> bool {
        !service.is_diagnostic() && duration > self.config.slow_hook_threshold
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("reporter", &self.reporter)
            .field("config", &self.config)
            .finish()
    }
}

fn record_outcome(
    hook: &'static str,
    outcome: &DispatchOutcome,
    duration: Duration,
    err: Option<&HookError>,
) {
    let status = outcome.status.as_u16();
    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = duration.as_millis() as u64;
    let span = tracing::Span::current();
    span.record("status", status);
    span.record("duration_ms", duration_ms);

    counter!(REQUESTS_TOTAL, "service" => hook, "status" => status.to_string()).increment(1);
    histogram!(HOOK_DURATION_SECONDS, "service" => hook).record(duration.as_secs_f64());

    match err {
        None => info!(status, duration_ms, "hook dispatched"),
        Some(err) if err.is_classified() => {
            warn!(status, duration_ms, class = err.class_name(), error = %err, "hook failed");
        }
        Some(err) => {
            error!(
                status,
                duration_ms,
                class = %err.root_class(),
                error = %err,
                "hook raised unclassified failure"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Outcome classification: invocation result -> `DispatchOutcome`.
//!
//! | result                      | status | body                                   |
//! |-----------------------------|--------|----------------------------------------|
//! | `Ok(Some(handle))`          | 200    | handle acknowledgement                 |
//! | `Ok(None)`                  | 200    | `<hook> Service does not respond to …` |
//! | `ConnectionFailed`          | 503    | failure message                        |
//! | `Configuration`             | 400    | failure message                        |
//! | `Timeout`                   | 504    | `Service Timeout`                      |
//! | `Missing`                   | 404    | failure message                        |
//! | `Panicked` / `Unclassified` | 500    | `ERROR`                                |

use hookshot_core::{HookError, ServiceHandle};
use http::StatusCode;

use super::outcome::DispatchOutcome;

/// Body returned for every timeout.
pub const TIMEOUT_BODY: &str = "Service Timeout";

/// Body returned for every unclassified failure.
pub const ERROR_BODY: &str = "ERROR";

/// Map an invocation result to the response sent to the caller.
#[must_use]
pub fn classify(
    hook_name: &str,
    event_name: &str,
    result: &Result<Option<ServiceHandle>, HookError>,
) -> DispatchOutcome {
    match result {
        Ok(Some(handle)) => DispatchOutcome::ok(handle.acknowledgement()),
        Ok(None) => DispatchOutcome::ok(format!(
            "{hook_name} Service does not respond to '{event_name}' events"
        )),
        Err(err) => classify_error(err),
    }
}

/// Map a failure to its status and body. Backtraces never reach the body.
#[must_use]
pub fn classify_error(err: &HookError) -> DispatchOutcome {
    match err {
        HookError::ConnectionFailed(msg) => {
            DispatchOutcome::new(StatusCode::SERVICE_UNAVAILABLE, msg.as_str())
        }
        HookError::Configuration(msg) => {
            DispatchOutcome::new(StatusCode::BAD_REQUEST, msg.as_str())
        }
        HookError::Timeout(_) => DispatchOutcome::new(StatusCode::GATEWAY_TIMEOUT, TIMEOUT_BODY),
        HookError::Missing(msg) => DispatchOutcome::new(StatusCode::NOT_FOUND, msg.as_str()),
        HookError::Panicked { .. } | HookError::Unclassified(_) => {
            DispatchOutcome::new(StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

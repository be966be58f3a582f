//! Service invocation with wall-clock duration measurement.
//!
//! The duration wraps the whole `receive` call, including failure and panic
//! unwinding. It is observed only after the call returns: a hung service is
//! never cancelled here.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::sync::Once;
use std::time::Duration;

use futures_util::FutureExt;
use hookshot_core::{HookError, HookService, InboundEvent, ServiceHandle};
use tokio::time::Instant;

/// Result of one `receive` call together with how long it took.
#[derive(Debug)]
pub struct Invocation {
    pub result: Result<Option<ServiceHandle>, HookError>,
    pub duration: Duration,
}

impl Invocation {
    /// The failure raised by the service, if any.
    #[must_use]
    pub fn error(&self) -> Option<&HookError> {
        self.result.as_ref().err()
    }
}

/// Where the last panic on a thread happened.
struct PanicSite {
    location: Option<String>,
    trace: Backtrace,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

/// Install a panic hook that records the panic site for the unwinding
/// thread, then defers to the previously installed hook.
fn install_panic_capture() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let site = PanicSite {
                location: info.location().map(ToString::to_string),
                trace: Backtrace::force_capture(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(site));
            previous(info);
        }));
    });
}

/// Call `service.receive` with the parsed event.
///
/// Panics inside the service are caught and surfaced as
/// [`HookError::Panicked`] with the panic site attached. No classification
/// happens here.
pub async fn invoke(service: &dyn HookService, event: &InboundEvent) -> Invocation {
    install_panic_capture();
    let start = Instant::now();
    let result = AssertUnwindSafe(service.receive(
        &event.event_name,
        &event.data,
        &event.payload,
    ))
    .catch_unwind()
    .await
    .unwrap_or_else(|panic| Err(panicked(panic.as_ref())));

    Invocation {
        result,
        duration: start.elapsed(),
    }
}

/// The unwind was caught on the thread that panicked, so the site recorded
/// by the hook on this thread belongs to it.
fn panicked(panic: &(dyn Any + Send)) -> HookError {
    let site = LAST_PANIC.with(|slot| slot.borrow_mut().take());
    let (location, trace) = match site {
        Some(site) => (site.location, Some(Box::new(site.trace))),
        None => (None, None),
    };
    HookError::Panicked {
        message: panic_message(panic),
        location,
        trace,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

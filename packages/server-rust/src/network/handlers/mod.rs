//! axum handlers and the state they share.

pub mod health;
pub mod hooks;

pub use health::health_handler;
pub use hooks::{dispatch_handler, root_handler, service_routes};

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;
use crate::service::Dispatcher;

/// Shared application state passed to all axum handlers via `State`.
#[derive(Clone)]
pub struct AppState {
    /// Runs event requests against the registered services.
    pub dispatcher: Arc<Dispatcher>,
    /// Health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Server process start time, used for uptime.
    pub start_time: Instant,
}

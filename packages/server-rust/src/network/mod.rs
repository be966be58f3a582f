//! HTTP surface: configuration, routes, middleware and shutdown control.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::{NetworkConfig, TlsConfig, DEFAULT_MAX_BODY_BYTES};
pub use handlers::AppState;
pub use module::{NetworkModule, DRAIN_TIMEOUT};
pub use shutdown::{HealthState, InFlightGuard, ShutdownController};

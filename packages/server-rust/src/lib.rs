//! `Hookshot` Server: webhook dispatch over axum, exception reporting, and
//! the built-in hook services.

pub mod cli;
pub mod hooks;
pub mod network;
pub mod report;
pub mod service;
pub mod telemetry;

pub use network::NetworkModule;
pub use report::ExceptionReporter;
pub use service::{Dispatcher, ServiceRegistry};

//! Best-effort exception reporting to the external diagnostics collector.
//!
//! 1. **Report** (`exception`): `HookError` + request context -> `ExceptionReport`
//! 2. **Sinks** (`sink`): where a report goes (collector over HTTP, or the
//!    local diagnostic log)
//! 3. **Reporter** (`reporter`): picks the sink for this host and swallows
//!    every delivery failure

pub mod config;
pub mod exception;
pub mod reporter;
pub mod sink;

pub use config::{local_hostname, ReporterConfig};
pub use exception::{ExceptionReport, ReportContext, MAX_BACKTRACE_FRAMES, MAX_MESSAGE_CHARS};
pub use reporter::{ExceptionReporter, ReporterError};
pub use sink::{CollectorSink, LocalSink, ReportSink};

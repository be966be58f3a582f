//! Webhook dispatch engine.
//!
//! This module implements the per-request pipeline:
//!
//! 1. **Registry** (`registry`): hook name -> `HookService`, frozen at boot
//! 2. **Parsing** (`parser`): HTTP request parts -> `InboundEvent`
//! 3. **Invocation** (`invoker`): `receive` call with duration measurement
//! 4. **Classification** (`classify`): result -> `DispatchOutcome`
//! 5. **Dispatch** (`dispatch`): composes the above and drives reporting

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod invoker;
pub mod outcome;
pub mod parser;
pub mod registry;

// Re-export key types for convenient access.
pub use classify::{classify, classify_error};
pub use config::DispatchConfig;
pub use dispatch::{Dispatcher, LONG_HOOK_MESSAGE};
pub use invoker::{invoke, Invocation};
pub use outcome::DispatchOutcome;
pub use parser::{parse_request, ParseError, JSON_CONTENT_TYPE};
pub use registry::{RegistryError, ServiceRegistry, ServiceRegistryBuilder, RESERVED_HOOK_NAMES};

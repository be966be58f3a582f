//! `Hookshot` Core: inbound events, the service capability contract, and the
//! failure taxonomy shared by the dispatcher and its plugins.

pub mod error;
pub mod event;
pub mod hash;
pub mod traits;

pub use error::HookError;
pub use event::{InboundEvent, Mapping};
pub use traits::{HookService, ServiceHandle};

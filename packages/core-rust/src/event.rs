//! Normalized inbound webhook event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object carried in the `data` and `payload` fields of a request.
pub type Mapping = Map<String, Value>;

/// A webhook notification after request parsing.
///
/// `event_name` comes from the route, never from the body. `data` holds the
/// per-installation service configuration and `payload` the platform's
/// event document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event_name: String,
    pub data: Mapping,
    pub payload: Mapping,
}

impl InboundEvent {
    /// Creates an event from its three parts.
    #[must_use]
    pub fn new(event_name: impl Into<String>, data: Mapping, payload: Mapping) -> Self {
        Self {
            event_name: event_name.into(),
            data,
            payload,
        }
    }

    /// Looks up a string field in `data`, treating empty strings as absent.
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        data_str(&self.data, key)
    }
}

/// Looks up a non-empty string field in a mapping.
#[must_use]
pub fn data_str<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

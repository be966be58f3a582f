//! Failure taxonomy shared by the dispatcher and every hook service.
//!
//! A service signals *how* it failed by choosing a variant; the dispatcher
//! maps variants to HTTP statuses. The `Display` text of each classified
//! variant is exactly what the caller sees in the response body.

use std::backtrace::Backtrace;
use std::error::Error as StdError;

/// Failure raised by a service's `receive` (or by request parsing).
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// A downstream dependency could not be reached.
    #[error("{0}")]
    ConnectionFailed(String),

    /// The user-supplied service configuration is invalid (bad format
    /// string, bad template, missing setting).
    #[error("{0}")]
    Configuration(String),

    /// A timeout surfaced from the transport or raised by the service.
    #[error("{0}")]
    Timeout(String),

    /// A referenced remote object does not exist.
    #[error("{0}")]
    Missing(String),

    /// The handler panicked. Carries the panic message when it was a
    /// string, plus the panic site and backtrace when a panic hook caught
    /// them.
    #[error("service panicked: {message}")]
    Panicked {
        message: String,
        location: Option<String>,
        trace: Option<Box<Backtrace>>,
    },

    /// Anything else.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl HookError {
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self::Missing(message.into())
    }

    /// A panic with no recorded site.
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
            location: None,
            trace: None,
        }
    }

    /// Stable class name used to group reports.
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "HookError::ConnectionFailed",
            Self::Configuration(_) => "HookError::Configuration",
            Self::Timeout(_) => "HookError::Timeout",
            Self::Missing(_) => "HookError::Missing",
            Self::Panicked { .. } => "HookError::Panicked",
            Self::Unclassified(_) => "HookError::Unclassified",
        }
    }

    /// Returns `true` for failures that map to a dedicated status code and
    /// are not reported to the collector.
    #[must_use]
    pub fn is_classified(&self) -> bool {
        !matches!(self, Self::Panicked { .. } | Self::Unclassified(_))
    }

    /// Type name of the innermost cause, used to group reports.
    ///
    /// Classified failures and panics report their own variant. Wrapped
    /// failures report the type of their root cause, so an I/O error and a
    /// JSON error raised through the same `?` do not collapse together.
    #[must_use]
    pub fn root_class(&self) -> String {
        match self {
            Self::Unclassified(err) => type_name_of(err.root_cause()),
            other => other.class_name().to_string(),
        }
    }

    /// Source location of a panic, when known.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Panicked { location, .. } => location.as_deref(),
            _ => None,
        }
    }

    /// The innermost cause of a wrapped failure, or `self` when nothing is
    /// wrapped.
    #[must_use]
    pub fn original(&self) -> &(dyn StdError + 'static) {
        match self {
            Self::Unclassified(err) => err.root_cause(),
            other => other as &(dyn StdError + 'static),
        }
    }

    /// Backtrace captured when the failure was created, if it carries one.
    ///
    /// `anyhow`-backed failures capture one when `RUST_BACKTRACE` or
    /// `RUST_LIB_BACKTRACE` enables capture. Panics carry the trace taken
    /// by the panic hook.
    #[must_use]
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            Self::Unclassified(err) => Some(err.backtrace()),
            Self::Panicked { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }
}

/// Name for a type-erased error.
///
/// Known library types are recognised by downcast. Anything else is named
/// by the leading path of its `Debug` form (`reqwest::Error { .. }`,
/// `Refused(..)`); ad-hoc message errors debug as a quoted string and fall
/// back to `anyhow::Error`.
fn type_name_of(err: &(dyn StdError + 'static)) -> String {
    macro_rules! known {
        ($($ty:ty),* $(,)?) => {
            $(
                if err.is::<$ty>() {
                    return std::any::type_name::<$ty>().to_string();
                }
            )*
        };
    }
    known!(
        std::io::Error,
        std::fmt::Error,
        std::num::ParseIntError,
        std::num::ParseFloatError,
        std::str::Utf8Error,
        std::string::FromUtf8Error,
        serde_json::Error,
    );

    let debug = format!("{err:?}");
    let head: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if head.starts_with(|c: char| c.is_alphabetic()) {
        head
    } else {
        "anyhow::Error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn classified_display_is_bare_message() {
        assert_eq!(
            HookError::configuration("Invalid message template").to_string(),
            "Invalid message template"
        );
        assert_eq!(HookError::missing("no such repo").to_string(), "no such repo");
        assert_eq!(HookError::connection_failed("refused").to_string(), "refused");
        assert_eq!(HookError::timeout("slow").to_string(), "slow");
    }

    #[test]
    fn classification_split() {
        assert!(HookError::configuration("x").is_classified());
        assert!(HookError::timeout("x").is_classified());
        assert!(!HookError::panicked("boom").is_classified());
        assert!(!HookError::from(anyhow::anyhow!("boom")).is_classified());
    }

    #[test]
    fn original_unwraps_context_chain() {
        let inner: Result<(), std::io::Error> = Err(std::io::Error::other("disk on fire"));
        let err = HookError::from(inner.context("writing audit log").unwrap_err());
        assert_eq!(err.to_string(), "writing audit log");
        assert_eq!(err.original().to_string(), "disk on fire");
    }

    #[test]
    fn original_of_classified_is_itself() {
        let err = HookError::missing("gone");
        assert_eq!(err.original().to_string(), "gone");
    }

    #[test]
    fn only_unclassified_and_traced_panics_carry_backtrace() {
        assert!(HookError::timeout("t").backtrace().is_none());
        assert!(HookError::panicked("p").backtrace().is_none());
        assert!(HookError::from(anyhow::anyhow!("x")).backtrace().is_some());

        let traced = HookError::Panicked {
            message: "p".into(),
            location: Some("src/lib.rs:1:1".into()),
            trace: Some(Box::new(Backtrace::disabled())),
        };
        assert!(traced.backtrace().is_some());
        assert_eq!(traced.location(), Some("src/lib.rs:1:1"));
    }

    #[derive(Debug, thiserror::Error)]
    enum StoreError {
        #[error("refused")]
        Refused,
    }

    #[test]
    fn root_class_names_the_innermost_cause() {
        let message = HookError::from(anyhow::anyhow!("db down"));
        let io = HookError::from(anyhow::Error::new(std::io::Error::other("disk full")));
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let json = HookError::from(anyhow::Error::new(json_err).context("decoding"));
        let custom = HookError::from(anyhow::Error::new(StoreError::Refused));

        assert_eq!(message.root_class(), "anyhow::Error");
        assert_eq!(io.root_class(), "std::io::error::Error");
        assert_eq!(json.root_class(), "serde_json::error::Error");
        assert_eq!(custom.root_class(), "Refused");
        assert_eq!(HookError::timeout("t").root_class(), "HookError::Timeout");
        assert_eq!(HookError::panicked("p").root_class(), "HookError::Panicked");
    }
}

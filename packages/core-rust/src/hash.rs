//! Rollup hashing for exception grouping.
//!
//! The diagnostics collector groups recurring failures by a digest of the
//! error class and the innermost backtrace frame, so two failures raised
//! from the same place collapse into one rollup.

use sha2::{Digest, Sha256};

/// Computes the rollup key for a failure: lowercase hex SHA-256 of
/// `error_class` immediately followed by `top_frame`.
///
/// # Examples
///
/// ```
/// use hookshot_core::hash::rollup_hash;
///
/// let a = rollup_hash("HookError::Unclassified", "at src/web.rs:10");
/// let b = rollup_hash("HookError::Unclassified", "at src/web.rs:10");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
#[must_use]
pub fn rollup_hash(error_class: &str, top_frame: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(error_class.as_bytes());
    hasher.update(top_frame.as_bytes());
    hex::encode(hasher.finalize())
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::rollup_hash;

    proptest! {
        #[test]
        fn rollup_hash_is_deterministic_hex(class in ".{0,40}", frame in ".{0,80}") {
            let a = rollup_hash(&class, &frame);
            prop_assert_eq!(&a, &rollup_hash(&class, &frame));
            prop_assert_eq!(a.len(), 64);
        }
    }
}

use std::time::Duration;

/// Dispatch-level configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// A non-diagnostic call taking strictly longer than this produces a
    /// "Long Service Hook" report. Detection only: the call is never cut
    /// short.
    pub slow_hook_threshold: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            slow_hook_threshold: Duration::from_secs(9),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_config_defaults() {
        assert_eq!(
            DispatchConfig::default().slow_hook_threshold,
            Duration::from_secs(9)
        );
    }
}

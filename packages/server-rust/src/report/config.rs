use std::time::Duration;

use sysinfo::System;

/// Name the operating system reports for this host, or `localhost` when it
/// reports none.
#[must_use]
pub fn local_hostname() -> String {
    System::host_name()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Exception reporter configuration.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Application name placed in every report.
    pub app: String,
    /// Name of this host. Compared against `production_host_pattern`.
    pub hostname: String,
    /// Hosts matching this regex send reports to the collector; all others
    /// log them locally.
    pub production_host_pattern: String,
    /// Collector endpoint receiving `json=<report>` form posts.
    pub collector_url: String,
    /// Upper bound on a single collector request.
    pub collector_timeout: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            app: "github-services".to_string(),
            hostname: local_hostname(),
            production_host_pattern: r"^sh1\.(rs|stg)\.github\.com$".to_string(),
            collector_url: "http://haystack:80/async".to_string(),
            collector_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_config_defaults() {
        let config = ReporterConfig::default();
        assert_eq!(config.app, "github-services");
        assert_eq!(config.hostname, local_hostname());
        assert!(!config.hostname.is_empty());
        assert_eq!(config.collector_url, "http://haystack:80/async");
        assert_eq!(config.collector_timeout, Duration::from_secs(5));
    }
}

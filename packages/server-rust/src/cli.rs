//! Command-line and environment configuration for the `hookshot` binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::hooks::{EmailConfig, HooksConfig};
use crate::network::{NetworkConfig, TlsConfig, DEFAULT_MAX_BODY_BYTES};
use crate::report::{local_hostname, ReporterConfig};
use crate::service::DispatchConfig;
use crate::telemetry::LogFormat;

/// Webhook dispatch server.
#[derive(Debug, Parser)]
#[command(name = "hookshot")]
#[command(about = "Receives webhook events and dispatches them to registered services")]
#[command(version)]
pub struct ServerArgs {
    /// Bind address.
    #[arg(long, env = "HOOKSHOT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port.
    #[arg(long, env = "HOOKSHOT_PORT", default_value_t = 8080)]
    pub port: u16,

    /// PEM certificate chain; enables TLS together with `--tls-key`.
    #[arg(long, env = "HOOKSHOT_TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key.
    #[arg(long, env = "HOOKSHOT_TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "HOOKSHOT_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Log output format.
    #[arg(long, env = "HOOKSHOT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "HOOKSHOT_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Calls slower than this many seconds are reported.
    #[arg(long, env = "HOOKSHOT_SLOW_HOOK_SECS", default_value_t = 9)]
    pub slow_hook_secs: u64,

    /// Application name in exception reports.
    #[arg(long, env = "HOOKSHOT_APP", default_value = "github-services")]
    pub app: String,

    /// Host name in exception reports; selects the report sink. Defaults
    /// to the name the operating system reports.
    #[arg(long, env = "HOOKSHOT_HOSTNAME")]
    pub hostname: Option<String>,

    /// Hosts matching this regex send reports to the collector.
    #[arg(
        long,
        env = "HOOKSHOT_PRODUCTION_HOSTS",
        default_value = r"^sh1\.(rs|stg)\.github\.com$"
    )]
    pub production_host_pattern: String,

    /// Exception collector endpoint.
    #[arg(long, env = "HOOKSHOT_COLLECTOR_URL", default_value = "http://haystack:80/async")]
    pub collector_url: String,

    /// Bound on one collector request, in seconds.
    #[arg(long, env = "HOOKSHOT_COLLECTOR_TIMEOUT_SECS", default_value_t = 5)]
    pub collector_timeout_secs: u64,

    /// Bound on one `web` hook delivery, in seconds.
    #[arg(long, env = "HOOKSHOT_WEB_TIMEOUT_SECS", default_value_t = 10)]
    pub web_timeout_secs: u64,

    #[command(flatten)]
    pub smtp: SmtpArgs,
}

/// Mail settings for the commit message checker.
#[derive(Clone, Default, clap::Args)]
pub struct SmtpArgs {
    #[arg(long = "smtp-address", env = "HOOKSHOT_SMTP_ADDRESS")]
    pub address: Option<String>,

    #[arg(id = "smtp_port", long = "smtp-port", env = "HOOKSHOT_SMTP_PORT")]
    pub port: Option<u16>,

    #[arg(long = "smtp-domain", env = "HOOKSHOT_SMTP_DOMAIN")]
    pub domain: Option<String>,

    #[arg(long = "smtp-user-name", env = "HOOKSHOT_SMTP_USER_NAME")]
    pub user_name: Option<String>,

    #[arg(long = "smtp-password", env = "HOOKSHOT_SMTP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long = "smtp-authentication", env = "HOOKSHOT_SMTP_AUTHENTICATION")]
    pub authentication: Option<String>,

    #[arg(long = "smtp-starttls", env = "HOOKSHOT_SMTP_STARTTLS")]
    pub enable_starttls_auto: bool,

    #[arg(long = "smtp-openssl-verify-mode", env = "HOOKSHOT_SMTP_OPENSSL_VERIFY_MODE")]
    pub openssl_verify_mode: Option<String>,

    #[arg(long = "noreply-address", env = "HOOKSHOT_NOREPLY_ADDRESS")]
    pub noreply_address: Option<String>,
}

impl std::fmt::Debug for SmtpArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&EmailConfig::from(self.clone()), f)
    }
}

impl ServerArgs {
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            tls,
            max_body_bytes: self.max_body_bytes,
        }
    }

    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            slow_hook_threshold: Duration::from_secs(self.slow_hook_secs),
        }
    }

    #[must_use]
    pub fn reporter_config(&self) -> ReporterConfig {
        ReporterConfig {
            app: self.app.clone(),
            hostname: self.hostname.clone().unwrap_or_else(local_hostname),
            production_host_pattern: self.production_host_pattern.clone(),
            collector_url: self.collector_url.clone(),
            collector_timeout: Duration::from_secs(self.collector_timeout_secs),
        }
    }

    #[must_use]
    pub fn hooks_config(&self) -> HooksConfig {
        HooksConfig {
            web_timeout: Duration::from_secs(self.web_timeout_secs),
            email: self.smtp.clone().into(),
        }
    }
}

impl From<SmtpArgs> for EmailConfig {
    fn from(args: SmtpArgs) -> Self {
        Self {
            address: args.address,
            port: args.port,
            domain: args.domain,
            user_name: args.user_name,
            password: args.password,
            authentication: args.authentication,
            enable_starttls_auto: args.enable_starttls_auto,
            openssl_verify_mode: args.openssl_verify_mode,
            noreply_address: args.noreply_address,
        }
    }
}

//! Outbound mail seam for the commit message checker.
//!
//! SMTP transport itself lives outside this crate; a [`Mailer`] receives
//! fully built messages together with the resolved delivery settings.

use async_trait::async_trait;
use hookshot_core::HookError;
use tracing::info;

/// Default envelope sender.
pub const DEFAULT_NOREPLY_ADDRESS: &str = "GitHub <noreply@github.com>";

/// Operator-supplied mail settings. Unset fields fall back to defaults when
/// resolved into [`DeliverySettings`].
#[derive(Clone, Default)]
pub struct EmailConfig {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub domain: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub authentication: Option<String>,
    pub enable_starttls_auto: bool,
    pub openssl_verify_mode: Option<String>,
    pub noreply_address: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("domain", &self.domain)
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("authentication", &self.authentication)
            .field("enable_starttls_auto", &self.enable_starttls_auto)
            .field("openssl_verify_mode", &self.openssl_verify_mode)
            .field("noreply_address", &self.noreply_address)
            .finish()
    }
}

/// SMTP settings with defaults applied.
#[derive(Clone, PartialEq, Eq)]
pub struct DeliverySettings {
    pub address: Option<String>,
    pub port: u16,
    pub domain: String,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub authentication: Option<String>,
    pub enable_starttls_auto: bool,
    pub openssl_verify_mode: Option<String>,
    pub from: String,
}

impl DeliverySettings {
    #[must_use]
    pub fn resolve(config: &EmailConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port.unwrap_or(25),
            domain: config
                .domain
                .clone()
                .unwrap_or_else(|| "localhost.localdomain".to_string()),
            user_name: config.user_name.clone(),
            password: config.password.clone(),
            authentication: config.authentication.clone(),
            enable_starttls_auto: config.enable_starttls_auto,
            openssl_verify_mode: config.openssl_verify_mode.clone(),
            from: config
                .noreply_address
                .clone()
                .unwrap_or_else(|| DEFAULT_NOREPLY_ADDRESS.to_string()),
        }
    }
}

impl std::fmt::Debug for DeliverySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliverySettings")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("domain", &self.domain)
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("authentication", &self.authentication)
            .field("enable_starttls_auto", &self.enable_starttls_auto)
            .field("openssl_verify_mode", &self.openssl_verify_mode)
            .field("from", &self.from)
            .finish()
    }
}

/// A plain-text notification mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub reply_to: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Sends mail. Implementations report transport problems through the usual
/// failure kinds (`ConnectionFailed`, `Timeout`, ...).
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn deliver(
        &self,
        settings: &DeliverySettings,
        message: &MailMessage,
    ) -> Result<(), HookError>;
}

/// Records each message in the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(
        &self,
        settings: &DeliverySettings,
        message: &MailMessage,
    ) -> Result<(), HookError> {
        info!(
            smtp_address = settings.address.as_deref(),
            smtp_port = settings.port,
            from = %message.from,
            to = ?message.to,
            cc = ?message.cc,
            subject = %message.subject,
            body_len = message.body.len(),
            "mail delivered to log"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_applies_defaults() {
        let settings = DeliverySettings::resolve(&EmailConfig::default());
        assert_eq!(settings.port, 25);
        assert_eq!(settings.domain, "localhost.localdomain");
        assert_eq!(settings.from, DEFAULT_NOREPLY_ADDRESS);
        assert!(settings.address.is_none());
        assert!(!settings.enable_starttls_auto);
    }

    #[test]
    fn resolve_keeps_configured_values() {
        let config = EmailConfig {
            address: Some("smtp.example.com".into()),
            port: Some(587),
            domain: Some("example.com".into()),
            enable_starttls_auto: true,
            noreply_address: Some("Hooks <hooks@example.com>".into()),
            ..EmailConfig::default()
        };
        let settings = DeliverySettings::resolve(&config);
        assert_eq!(settings.address.as_deref(), Some("smtp.example.com"));
        assert_eq!(settings.port, 587);
        assert_eq!(settings.domain, "example.com");
        assert!(settings.enable_starttls_auto);
        assert_eq!(settings.from, "Hooks <hooks@example.com>");
    }

    #[test]
    fn debug_redacts_password() {
        let config = EmailConfig {
            password: Some("hunter2".into()),
            ..EmailConfig::default()
        };
        for rendered in [
            format!("{config:?}"),
            format!("{:?}", DeliverySettings::resolve(&config)),
        ] {
            assert!(!rendered.contains("hunter2"));
            assert!(rendered.contains("<redacted>"));
        }
    }

    #[tokio::test]
    async fn log_mailer_accepts_messages() {
        let message = MailMessage {
            from: DEFAULT_NOREPLY_ADDRESS.into(),
            reply_to: DEFAULT_NOREPLY_ADDRESS.into(),
            to: vec!["dev@example.com".into()],
            cc: vec![],
            subject: "s".into(),
            body: "b".into(),
        };
        let settings = DeliverySettings::resolve(&EmailConfig::default());
        assert!(LogMailer.deliver(&settings, &message).await.is_ok());
    }
}

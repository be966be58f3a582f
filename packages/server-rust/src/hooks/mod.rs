//! Built-in hook services and their boot-time registration.

pub mod commit_msg_checker;
pub mod web;

use std::sync::Arc;
use std::time::Duration;

pub use commit_msg_checker::{CommitMsgChecker, EmailConfig, LogMailer, Mailer};
pub use web::{WebService, DEFAULT_DELIVERY_TIMEOUT};

use crate::service::{RegistryError, ServiceRegistry, ServiceRegistryBuilder};

/// Settings for the built-in services.
#[derive(Debug, Clone)]
pub struct HooksConfig {
    /// Bound on one outbound `web` delivery.
    pub web_timeout: Duration,
    /// Mail settings for `commit_msg_checker`.
    pub email: EmailConfig,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            web_timeout: DEFAULT_DELIVERY_TIMEOUT,
            email: EmailConfig::default(),
        }
    }
}

/// Boot-time failures while constructing the built-in services.
#[derive(Debug, thiserror::Error)]
pub enum HooksError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to build web delivery client: {0}")]
    WebClient(#[source] anyhow::Error),
}

/// Register every built-in service on `builder`.
///
/// # Errors
///
/// Returns [`HooksError`] if a service cannot be built or its hook name is
/// already taken.
pub fn register_builtin(
    builder: &mut ServiceRegistryBuilder,
    config: &HooksConfig,
    mailer: Arc<dyn Mailer>,
) -> Result<(), HooksError> {
    let web = WebService::new(config.web_timeout).map_err(HooksError::WebClient)?;
    builder
        .register(web)?
        .register(CommitMsgChecker::new(mailer, config.email.clone()))?;
    Ok(())
}

/// A registry holding exactly the built-in services.
///
/// # Errors
///
/// See [`register_builtin`].
pub fn builtin_registry(
    config: &HooksConfig,
    mailer: Arc<dyn Mailer>,
) -> Result<ServiceRegistry, HooksError> {
    let mut builder = ServiceRegistry::builder();
    register_builtin(&mut builder, config, mailer)?;
    Ok(builder.build())
}

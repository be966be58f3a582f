use std::collections::HashMap;
use std::sync::Arc;

use hookshot_core::HookService;

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Boot-time registration failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("hook name `{0}` is registered more than once")]
    DuplicateHookName(&'static str),
    #[error("hook name `{0}` is not a valid route segment")]
    InvalidHookName(&'static str),
    #[error("hook name `{0}` collides with a built-in route")]
    ReservedHookName(&'static str),
}

/// Route segments owned by the server itself.
pub const RESERVED_HOOK_NAMES: &[&str] = &["health"];

// ---------------------------------------------------------------------------
// ServiceRegistryBuilder
// ---------------------------------------------------------------------------

/// Collects services at process start. Consumed by [`build`](Self::build),
/// after which the set of services can no longer change.
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    by_name: HashMap<&'static str, Arc<dyn HookService>>,
    order: Vec<&'static str>,
}

impl ServiceRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under its `hook_name()`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateHookName`] if another service
    /// already claimed the name, or [`RegistryError::InvalidHookName`] if
    /// the name cannot be used as a single path segment, or
    /// [`RegistryError::ReservedHookName`] if the server already routes it.
    pub fn register<T: HookService>(&mut self, service: T) -> Result<&mut Self, RegistryError> {
        self.register_arc(Arc::new(service))
    }

    /// Register an already shared service.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_arc(
        &mut self,
        service: Arc<dyn HookService>,
    ) -> Result<&mut Self, RegistryError> {
        let name = service.hook_name();
        if !is_valid_hook_name(name) {
            return Err(RegistryError::InvalidHookName(name));
        }
        if RESERVED_HOOK_NAMES.contains(&name) {
            return Err(RegistryError::ReservedHookName(name));
        }
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateHookName(name));
        }
        self.by_name.insert(name, service);
        self.order.push(name);
        Ok(self)
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            by_name: self.by_name,
            order: self.order,
        }
    }
}

fn is_valid_hook_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

// ---------------------------------------------------------------------------
// ServiceRegistry
// ---------------------------------------------------------------------------

/// Immutable table of registered hook services, keyed by hook name.
///
/// Read-only after boot, so concurrent requests share it through an `Arc`
/// without locking. Iteration follows registration order.
pub struct ServiceRegistry {
    by_name: HashMap<&'static str, Arc<dyn HookService>>,
    order: Vec<&'static str>,
}

impl ServiceRegistry {
    /// Start collecting services.
    #[must_use]
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::new()
    }

    /// Retrieve a service by its hook name.
    #[must_use]
    pub fn lookup(&self, hook_name: &str) -> Option<Arc<dyn HookService>> {
        self.by_name.get(hook_name).cloned()
    }

    /// All services in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn HookService>> + '_ {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.order)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Provider registry consulted when a job is built or validated.
//!
//! The registry is constructed once at startup and passed by reference to
//! whoever needs it; there is no process-wide provider table.
use std::sync::Arc;

use drover_dsl::ProviderCatalog;
use tracing::{debug, instrument};

use crate::{error::CoreError, provider::Provider};

/// Named provider prototypes, in registration order.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register a provider prototype.
    ///
    /// Names must be unique; the DSL has no other way to tell two providers apart.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<(), CoreError> {
        let name = provider.name();
        if self.get(name).is_some() {
            return Err(CoreError::DuplicateProvider(name.to_string()));
        }
        debug!(provider = name, "provider registered");
        self.providers.push(provider);
        Ok(())
    }

    /// Look up a prototype by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Create a fresh instance of the named provider.
    #[instrument(level = "trace", skip(self))]
    pub fn instantiate(&self, name: &str) -> Result<Arc<dyn Provider>, CoreError> {
        self.get(name)
            .map(|p| p.new_instance())
            .ok_or_else(|| CoreError::UnknownProvider(name.to_string()))
    }

    /// Names of all registered providers.
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl ProviderCatalog for ProviderRegistry {
    fn contains(&self, provider: &str) -> bool {
        self.get(provider).is_some()
    }
}

//! Plugin-based provider registry
//!
//! The registry allows DNS providers to be registered by type name, so the
//! daemon builds its gateway from configuration without hardcoded if-else
//! chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ifddns_core::registry::ProviderRegistry;
//!
//! let mut registry = ProviderRegistry::new();
//! ifddns_provider_aliyun::register(&mut registry);
//!
//! let provider = registry.create_provider(&config.provider)?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory};
use std::collections::HashMap;

/// Provider registry for plugin-based DNS provider creation
///
/// Populated once during startup, before any provider is created.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: HashMap<String, Box<dyn DnsProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name, matching [`ProviderConfig::type_name`]
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(
        &mut self,
        name: impl Into<String>,
        factory: Box<dyn DnsProviderFactory>,
    ) {
        self.providers.insert(name.into(), factory);
    }

    /// Create a DNS provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error::Config)`: If provider type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();

        let factory = self
            .providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    struct MockProviderFactory;

    impl DnsProviderFactory for MockProviderFactory {
        fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
            Err(Error::config("Mock provider not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let mut registry = ProviderRegistry::new();

        assert!(!registry.has_provider("mock"));

        registry.register_provider("mock", Box::new(MockProviderFactory));

        assert!(registry.has_provider("mock"));
    }

    #[test]
    fn unknown_provider_type_is_config_error() {
        let registry = ProviderRegistry::new();
        let config = ProviderConfig::Aliyun {
            credentials: Credentials::new("id", "secret"),
        };

        let result = registry.create_provider(&config);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

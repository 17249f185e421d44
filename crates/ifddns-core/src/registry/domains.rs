//! Registry of active domain bindings
//!
//! Membership is append-only: a binding enters the registry only after it
//! resolved to a provider record id, and it stays for the life of the
//! process. The registry is owned by the [`Reconciler`](crate::Reconciler)
//! that mutates it, so it needs no locking.

use crate::binding::DomainBinding;
use crate::config::BindingConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, IpSource};
use tracing::{debug, info};

/// Ordered collection of resolved bindings
#[derive(Debug, Default)]
pub struct DomainRegistry {
    bindings: Vec<DomainBinding>,
}

impl DomainRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `config` against the provider and append it
    ///
    /// Fails without touching the provider when a binding field is empty
    /// (`Error::Config`) or when the interface currently has no IPv4 address
    /// (`Error::Resolution`). Provider lookups that find nothing are
    /// `Error::Resolution` as well. No retry happens here.
    pub async fn add(
        &mut self,
        config: BindingConfig,
        provider: &dyn DnsProvider,
        ip_source: &dyn IpSource,
    ) -> Result<&DomainBinding> {
        config.validate()?;

        if ip_source.current(&config.interface_name).await.is_none() {
            return Err(Error::resolution(format!(
                "Interface {} has no usable IPv4 address",
                config.interface_name
            )));
        }

        debug!(
            "Resolving record id for {} via {}",
            config.fqdn(),
            provider.provider_name()
        );
        let record_id = provider
            .resolve(&config.domain_name, &config.record_prefix)
            .await?;

        if record_id.is_empty() {
            return Err(Error::resolution(format!(
                "Provider returned an empty record id for {}",
                config.fqdn()
            )));
        }

        info!(
            "Registered {} (interface: {}, recordId: {})",
            config.fqdn(),
            config.interface_name,
            record_id
        );

        self.bindings.push(DomainBinding::resolved(config, record_id));
        self.bindings
            .last()
            .ok_or_else(|| Error::Other("Registered binding was not stored".to_string()))
    }

    /// Number of registered bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate bindings in registration order
    pub fn iter(&self) -> impl Iterator<Item = &DomainBinding> {
        self.bindings.iter()
    }

    /// Look up a binding by domain and record prefix
    pub fn find(&self, domain_name: &str, record_prefix: &str) -> Option<&DomainBinding> {
        self.bindings
            .iter()
            .find(|b| b.domain_name() == domain_name && b.record_prefix() == record_prefix)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut DomainBinding> {
        self.bindings.iter_mut()
    }
}

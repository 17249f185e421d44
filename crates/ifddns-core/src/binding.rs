//! Domain bindings
//!
//! A [`DomainBinding`] is a configured record/interface pair that has been
//! resolved to a provider record id. It carries the one piece of mutable
//! state in the system: the value this process believes is converged on the
//! provider side.

use crate::config::BindingConfig;
use std::net::Ipv4Addr;

/// A resolved domain-to-interface binding
///
/// Bindings only exist in resolved form: the record id is fixed at
/// construction and never changes. The cached value starts unknown, which
/// forces a sync on the first tick after every process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainBinding {
    config: BindingConfig,
    record_id: String,
    cached_value: Option<Ipv4Addr>,
}

impl DomainBinding {
    pub(crate) fn resolved(config: BindingConfig, record_id: String) -> Self {
        Self {
            config,
            record_id,
            cached_value: None,
        }
    }

    /// Registered domain (e.g., "example.com")
    pub fn domain_name(&self) -> &str {
        &self.config.domain_name
    }

    /// Record prefix (RR)
    pub fn record_prefix(&self) -> &str {
        &self.config.record_prefix
    }

    /// Record type (e.g., "A")
    pub fn record_type(&self) -> &str {
        &self.config.record_type
    }

    /// Monitored interface
    pub fn interface_name(&self) -> &str {
        &self.config.interface_name
    }

    /// Provider-assigned record id
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Fully qualified record name
    pub fn fqdn(&self) -> String {
        self.config.fqdn()
    }

    /// Last value believed converged, `None` until the first successful sync
    ///
    /// This is an optimistic local cache, not provider state.
    pub fn cached_value(&self) -> Option<Ipv4Addr> {
        self.cached_value
    }

    /// Record `value` as converged, returning the previous cached value
    pub(crate) fn apply_observed_value(&mut self, value: Ipv4Addr) -> Option<Ipv4Addr> {
        self.cached_value.replace(value)
    }

    /// Restore the cached value captured before a failed update
    pub(crate) fn rollback_to(&mut self, previous: Option<Ipv4Addr>) {
        self.cached_value = previous;
    }
}

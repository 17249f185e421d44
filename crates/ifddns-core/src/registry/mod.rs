//! Registries
//!
//! - [`DomainRegistry`]: the resolved bindings the reconciler keeps converged
//! - [`ProviderRegistry`]: factories for building a [`DnsProvider`](crate::DnsProvider) from config

pub mod domains;
pub mod providers;

pub use domains::DomainRegistry;
pub use providers::ProviderRegistry;

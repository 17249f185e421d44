// # ifddns-core
//
// Core library for interface-driven DDNS reconciliation.
//
// ## Architecture Overview
//
// This library keeps DNS records pointed at the IPv4 address of a local
// network interface:
// - **IpSource**: Trait for observing the address of a named interface
// - **DnsProvider**: Trait for resolving, updating and reading back records
// - **DomainBinding**: A resolved record/interface pair with its cached value
// - **DomainRegistry**: The ordered, append-only set of resolved bindings
// - **Reconciler**: Registers bindings, then ticks forever: observe → update → verify
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Single Writer**: The reconciler owns the registry; no shared mutable state
// 3. **Plugin-Based**: Providers are registered by type name, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Provider Over Memory**: A legible read-back beats the local cache

pub mod traits;
pub mod binding;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpSource, DnsProvider, DnsProviderFactory};
pub use binding::DomainBinding;
pub use engine::{BindingOutcome, EngineEvent, OutcomeStatus, Reconciler, TickReport};
pub use engine::schedule::{IntervalTicker, Ticker};
pub use registry::{DomainRegistry, ProviderRegistry};
pub use config::{BindingConfig, Credentials, DdnsConfig, EngineConfig, ProviderConfig};
pub use error::{Error, Result};

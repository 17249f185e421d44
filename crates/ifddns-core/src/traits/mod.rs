//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Observe the IPv4 address of a local interface
//! - [`DnsProvider`]: Resolve, update and read back records via provider APIs

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::{DnsProvider, DnsProviderFactory};

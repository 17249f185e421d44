// # IP Source Trait
//
// Defines how the engine observes the address of a local network interface.
//
// ## Implementations
//
// - getifaddrs-based (unix): `ifddns-ip-ifaddrs` crate
//
// ## Usage
//
// ```rust,ignore
// use ifddns_core::IpSource;
//
// #[tokio::main]
// async fn main() {
//     let source = /* IpSource implementation */;
//
//     match source.current("eth0").await {
//         Some(ip) => println!("eth0 is {ip}"),
//         None => println!("eth0 has no usable IPv4 address"),
//     }
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for IP source implementations
///
/// # Contract
///
/// `current` returns the first IPv4 address of the interface whose name equals
/// `interface_name` exactly, provided the interface is administratively up and
/// the address is not a loopback address.
///
/// A missing, down, or address-less interface is `None`, not an error: losing
/// connectivity is an expected transient condition for a DDNS client.
///
/// # Forbidden Capabilities
/// - ❌ Perform DNS updates (use `DnsProvider`)
/// - ❌ Spawn polling loops (the `Reconciler` owns the schedule)
/// - ❌ Cache addresses between calls
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current IPv4 address of `interface_name`
    async fn current(&self, interface_name: &str) -> Option<Ipv4Addr>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str {
        "unknown"
    }
}

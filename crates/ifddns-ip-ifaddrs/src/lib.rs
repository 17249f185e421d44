// # Interface IPv4 Reader
//
// This crate reads the IPv4 address of a named local interface using
// `getifaddrs(3)`.
//
// An address qualifies when its interface:
// 1. has exactly the requested name
// 2. is administratively up (`IFF_UP`)
// 3. carries an IPv4 address that is not a loopback address
//
// The first qualifying address wins. "No address" is a normal answer, not
// an error: an interface that is down or missing simply yields `None`.
//
// ## Platform Support
//
// Unix only. On other platforms every lookup yields `None`.

use async_trait::async_trait;
use ifddns_core::traits::IpSource;
use std::io;
use std::net::Ipv4Addr;

/// One IPv4 address found on a local interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    /// Interface name (e.g., "eth0")
    pub name: String,
    /// Whether `IFF_UP` is set
    pub is_up: bool,
    /// The address
    pub addr: Ipv4Addr,
}

/// Pick the first usable address of `interface_name`
pub fn select_address(addrs: &[InterfaceAddr], interface_name: &str) -> Option<Ipv4Addr> {
    addrs
        .iter()
        .find(|a| a.name == interface_name && a.is_up && !a.addr.is_loopback())
        .map(|a| a.addr)
}

/// Enumerate every IPv4 address on every local interface
#[cfg(unix)]
pub fn enumerate() -> io::Result<Vec<InterfaceAddr>> {
    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::InterfaceFlags;
    use std::net::SocketAddrV4;

    let addrs = getifaddrs()
        .map_err(io::Error::from)?
        .filter_map(|ifa| {
            let sin = *ifa.address.as_ref()?.as_sockaddr_in()?;
            Some(InterfaceAddr {
                is_up: ifa.flags.contains(InterfaceFlags::IFF_UP),
                addr: *SocketAddrV4::from(sin).ip(),
                name: ifa.interface_name,
            })
        })
        .collect();

    Ok(addrs)
}

/// Enumerate every IPv4 address on every local interface
#[cfg(not(unix))]
pub fn enumerate() -> io::Result<Vec<InterfaceAddr>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interface enumeration requires getifaddrs",
    ))
}

/// IP source backed by `getifaddrs(3)`
///
/// Stateless: every call enumerates the interfaces again.
#[derive(Debug, Default, Clone, Copy)]
pub struct IfaddrsIpSource;

impl IfaddrsIpSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IpSource for IfaddrsIpSource {
    async fn current(&self, interface_name: &str) -> Option<Ipv4Addr> {
        let addrs = match tokio::task::spawn_blocking(enumerate).await {
            Ok(Ok(addrs)) => addrs,
            Ok(Err(e)) => {
                tracing::debug!("Failed to enumerate interfaces: {}", e);
                return None;
            }
            Err(e) => {
                tracing::debug!("Interface enumeration task failed: {}", e);
                return None;
            }
        };

        let addr = select_address(&addrs, interface_name);
        if addr.is_none() {
            tracing::debug!("No usable IPv4 address on {}", interface_name);
        }
        addr
    }

    fn source_name(&self) -> &'static str {
        "ifaddrs"
    }
}

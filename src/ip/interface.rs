//! Resolution of a local interface's IPv4 address and netmask.

use std::io;
use std::net::Ipv4Addr;

/// IPv4 configuration of a local interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

/// Looks up the first IPv4 address configured on an interface
pub trait InterfaceResolver {
    /// `Ok(None)` when the interface does not exist or has no IPv4 address
    fn ipv4(&self, interface: &str) -> io::Result<Option<InterfaceAddress>>;
}

/// Reads interface addresses from the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl InterfaceResolver for SystemInterfaces {
    fn ipv4(&self, interface: &str) -> io::Result<Option<InterfaceAddress>> {
        let found = get_if_addrs::get_if_addrs()?
            .into_iter()
            .filter(|iface| iface.name == interface)
            .find_map(|iface| match iface.addr {
                get_if_addrs::IfAddr::V4(v4) => Some(InterfaceAddress {
                    address: v4.ip,
                    netmask: v4.netmask,
                }),
                get_if_addrs::IfAddr::V6(_) => None,
            });
        Ok(found)
    }
}

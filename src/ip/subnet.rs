//! Subnet descriptors and candidate host addresses.
//!
//! A subnet is described by the first three octets of the owning
//! interface's address plus the netmask length. Candidates are formed by
//! substituting the host octet.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Base octets and prefix length of the subnet an interface lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetDescriptor {
    base: [u8; 3],
    prefix_len: u8,
}

impl SubnetDescriptor {
    /// Build a descriptor from an interface address and its netmask
    pub fn from_interface(address: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        let [a, b, c, _] = address.octets();
        SubnetDescriptor {
            base: [a, b, c],
            prefix_len: netmask_bits(netmask),
        }
    }

    /// The base three octets in dotted form, e.g. `192.168.1`
    pub fn base(&self) -> String {
        let [a, b, c] = self.base;
        format!("{}.{}.{}", a, b, c)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Candidate address for the given host octet
    pub fn candidate(&self, host: u8) -> HostAddress {
        let [a, b, c] = self.base;
        HostAddress::new(Ipv4Addr::new(a, b, c, host), self.prefix_len)
    }
}

impl fmt::Display for SubnetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.0/{}", self.base(), self.prefix_len)
    }
}

/// Number of set bits across the four netmask octets
pub fn netmask_bits(netmask: Ipv4Addr) -> u8 {
    netmask
        .octets()
        .iter()
        .map(|octet| octet.count_ones() as u8)
        .sum()
}

/// An IPv4 address together with the prefix length it is configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostAddress {
    ip: Ipv4Addr,
    prefix_len: u8,
}

/// Errors parsing an `a.b.c.d/nn` string
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CidrParseError {
    #[error("missing '/' prefix length in '{0}'")]
    MissingPrefix(String),

    #[error("invalid IPv4 address in '{0}'")]
    InvalidAddress(String),

    #[error("invalid prefix length in '{0}' (expected 0-32)")]
    InvalidPrefix(String),
}

impl HostAddress {
    pub fn new(ip: Ipv4Addr, prefix_len: u8) -> Self {
        HostAddress { ip, prefix_len }
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The `a.b.c.d/nn` form used in netplan documents
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.ip, self.prefix_len)
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cidr())
    }
}

impl FromStr for HostAddress {
    type Err = CidrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip, prefix) = s
            .split_once('/')
            .ok_or_else(|| CidrParseError::MissingPrefix(s.to_string()))?;
        let ip = ip
            .parse::<Ipv4Addr>()
            .map_err(|_| CidrParseError::InvalidAddress(s.to_string()))?;
        let prefix_len = prefix
            .parse::<u8>()
            .ok()
            .filter(|bits| *bits <= 32)
            .ok_or_else(|| CidrParseError::InvalidPrefix(s.to_string()))?;
        Ok(HostAddress::new(ip, prefix_len))
    }
}

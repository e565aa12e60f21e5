//! Sequential free-address scanning.
//!
//! Candidates in the configured host window are probed one at a time in
//! ascending host order. The scan stops at the first `desired_count` free
//! addresses or when the window runs out, whichever comes first.
//!
//! A scan is a probe, not a reservation: an address reported free may be
//! taken by another host before it is configured.

use super::audit::AuditLog;
use super::interface::InterfaceResolver;
use super::probe::Prober;
use super::subnet::{HostAddress, SubnetDescriptor};
use log::{debug, info, warn};
use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Default time to wait for an echo reply
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors that abort a scan
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("interface '{interface}' has no configured IPv4 address")]
    UnknownInterface { interface: String },

    #[error("invalid scan window [{start}, {end}): start must be below end and end at most 256")]
    InvalidWindow { start: u16, end: u16 },

    #[error("failed to list network interfaces: {0}")]
    Interfaces(#[source] io::Error),

    #[error("failed to probe {address}: {source}")]
    Probe {
        address: Ipv4Addr,
        #[source]
        source: io::Error,
    },

    #[error("failed to append to audit log {path}: {source}")]
    AuditLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fewer free addresses were found than requested
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("address pool exhausted on '{interface}': requested {requested}, found {found}")]
pub struct AddressPoolExhausted {
    pub interface: String,
    pub requested: usize,
    pub found: usize,
}

/// Host window and probe timing for a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    start_host: u8,
    end_host: u16,
    probe_timeout: Duration,
}

impl ScanConfig {
    /// `start_host` is inclusive, `end_host` exclusive (at most 256)
    pub fn new(start_host: u16, end_host: u16, probe_timeout: Duration) -> Result<Self, ScanError> {
        if start_host >= end_host || end_host > 256 {
            return Err(ScanError::InvalidWindow { start: start_host, end: end_host });
        }
        Ok(ScanConfig {
            start_host: start_host as u8,
            end_host,
            probe_timeout,
        })
    }

    pub fn start_host(&self) -> u8 {
        self.start_host
    }

    pub fn end_host(&self) -> u16 {
        self.end_host
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Host octets in ascending order
    pub fn hosts(&self) -> impl Iterator<Item = u8> {
        (u16::from(self.start_host)..self.end_host).map(|host| host as u8)
    }

    pub fn window_size(&self) -> usize {
        usize::from(self.end_host - u16::from(self.start_host))
    }
}

/// Result of one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub interface: String,
    pub subnet: SubnetDescriptor,
    pub requested: usize,
    /// Free addresses in ascending host order, never more than `requested`
    pub addresses: Vec<HostAddress>,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.addresses.len() >= self.requested
    }

    /// How many requested addresses are missing
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.addresses.len())
    }

    /// Turn a short result into an error for callers that need every address
    pub fn ensure_complete(self) -> Result<Self, AddressPoolExhausted> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(AddressPoolExhausted {
                interface: self.interface,
                requested: self.requested,
                found: self.addresses.len(),
            })
        }
    }
}

/// Finds unused addresses on the subnet of a local interface
pub struct Scanner<R, P> {
    resolver: R,
    prober: P,
    config: ScanConfig,
    audit: Option<AuditLog>,
}

impl<R: InterfaceResolver, P: Prober> Scanner<R, P> {
    pub fn new(resolver: R, prober: P, config: ScanConfig) -> Self {
        Scanner {
            resolver,
            prober,
            config,
            audit: None,
        }
    }

    /// Record every free address found by a completed scan in `audit`
    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Resolve the subnet descriptor of `interface`
    pub fn subnet(&self, interface: &str) -> Result<SubnetDescriptor, ScanError> {
        let iface = self
            .resolver
            .ipv4(interface)
            .map_err(ScanError::Interfaces)?
            .ok_or_else(|| ScanError::UnknownInterface { interface: interface.to_string() })?;
        Ok(SubnetDescriptor::from_interface(iface.address, iface.netmask))
    }

    /// Probe the window and return up to `desired_count` free addresses.
    ///
    /// A short result is not an error here; check [`ScanReport::is_complete`]
    /// or call [`ScanReport::ensure_complete`].
    pub fn scan_free(&self, interface: &str, desired_count: usize) -> Result<ScanReport, ScanError> {
        let subnet = self.subnet(interface)?;
        info!(
            "Scanning {} on {} for {} free address(es), hosts {}..{}",
            subnet,
            interface,
            desired_count,
            self.config.start_host,
            self.config.end_host
        );

        let mut addresses = Vec::with_capacity(desired_count);
        if desired_count > 0 {
            for host in self.config.hosts() {
                let candidate = subnet.candidate(host);
                let alive = self
                    .prober
                    .is_alive(candidate.ip())
                    .map_err(|source| ScanError::Probe { address: candidate.ip(), source })?;
                if alive {
                    debug!("{} is in use", candidate.ip());
                    continue;
                }
                info!("Found free address {}", candidate.cidr());
                addresses.push(candidate);
                if addresses.len() >= desired_count {
                    break;
                }
            }
        }

        if addresses.len() < desired_count {
            warn!(
                "Scan window exhausted on {}: requested {}, found {}",
                interface,
                desired_count,
                addresses.len()
            );
        }

        if let Some(audit) = &self.audit {
            audit.append(&addresses).map_err(|source| ScanError::AuditLog {
                path: audit.path().to_path_buf(),
                source,
            })?;
        }

        Ok(ScanReport {
            interface: interface.to_string(),
            subnet,
            requested: desired_count,
            addresses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::interface::InterfaceAddress;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use tempfile::TempDir;

    struct FakeInterfaces(HashMap<String, InterfaceAddress>);

    impl FakeInterfaces {
        fn eth0(address: Ipv4Addr, netmask: Ipv4Addr) -> Self {
            let mut map = HashMap::new();
            map.insert("eth0".to_string(), InterfaceAddress { address, netmask });
            FakeInterfaces(map)
        }
    }

    impl InterfaceResolver for FakeInterfaces {
        fn ipv4(&self, interface: &str) -> io::Result<Option<InterfaceAddress>> {
            Ok(self.0.get(interface).copied())
        }
    }

    /// Answers for every host octet except the listed free ones
    struct FakeProber {
        free_hosts: HashSet<u8>,
        probed: RefCell<Vec<u8>>,
    }

    impl FakeProber {
        fn free(hosts: &[u8]) -> Self {
            FakeProber {
                free_hosts: hosts.iter().copied().collect(),
                probed: RefCell::new(Vec::new()),
            }
        }
    }

    impl Prober for FakeProber {
        fn is_alive(&self, address: Ipv4Addr) -> io::Result<bool> {
            let host = address.octets()[3];
            self.probed.borrow_mut().push(host);
            Ok(!self.free_hosts.contains(&host))
        }
    }

    struct BrokenProber;

    impl Prober for BrokenProber {
        fn is_alive(&self, _address: Ipv4Addr) -> io::Result<bool> {
            Err(io::Error::new(io::ErrorKind::NotFound, "ping not found"))
        }
    }

    /// Free below `fails_at`, then pinging itself fails
    struct FailingProber {
        fails_at: u8,
    }

    impl Prober for FailingProber {
        fn is_alive(&self, address: Ipv4Addr) -> io::Result<bool> {
            if address.octets()[3] >= self.fails_at {
                Err(io::Error::new(io::ErrorKind::Other, "network unreachable"))
            } else {
                Ok(false)
            }
        }
    }

    fn lan() -> FakeInterfaces {
        FakeInterfaces::eth0(Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(255, 255, 255, 0))
    }

    fn window(start: u16, end: u16) -> ScanConfig {
        ScanConfig::new(start, end, DEFAULT_PROBE_TIMEOUT).unwrap()
    }

    #[test]
    fn test_returns_first_free_in_host_order() {
        let scanner = Scanner::new(lan(), FakeProber::free(&[53, 51]), window(50, 60));
        let report = scanner.scan_free("eth0", 2).unwrap();

        let ips: Vec<String> = report.addresses.iter().map(|a| a.ip().to_string()).collect();
        assert_eq!(ips, vec!["192.168.1.51", "192.168.1.53"]);
        assert_eq!(report.addresses[0].cidr(), "192.168.1.51/24");
        assert!(report.is_complete());
    }

    #[test]
    fn test_stops_probing_once_enough_are_found() {
        let scanner = Scanner::new(lan(), FakeProber::free(&[51, 53, 55]), window(50, 60));
        scanner.scan_free("eth0", 2).unwrap();
        assert_eq!(*scanner.prober.probed.borrow(), vec![50, 51, 52, 53]);
    }

    #[test]
    fn test_shortfall_is_reported_not_padded() {
        let scanner = Scanner::new(lan(), FakeProber::free(&[52, 57]), window(50, 60));
        let report = scanner.scan_free("eth0", 5).unwrap();

        assert_eq!(report.addresses.len(), 2);
        assert_eq!(report.shortfall(), 3);
        let err = report.ensure_complete().unwrap_err();
        assert_eq!(err.requested, 5);
        assert_eq!(err.found, 2);
        assert_eq!(err.interface, "eth0");
    }

    #[test]
    fn test_never_exceeds_desired_count_or_repeats() {
        let all: Vec<u8> = (0..=255).collect();
        let scanner = Scanner::new(lan(), FakeProber::free(&all), window(0, 256));
        for desired in [0, 1, 7, 256, 300] {
            let report = scanner.scan_free("eth0", desired).unwrap();
            assert!(report.addresses.len() <= desired);
            let unique: HashSet<_> = report.addresses.iter().collect();
            assert_eq!(unique.len(), report.addresses.len());
        }
    }

    #[test]
    fn test_zero_desired_probes_nothing() {
        let scanner = Scanner::new(lan(), FakeProber::free(&[50]), window(50, 60));
        let report = scanner.scan_free("eth0", 0).unwrap();
        assert!(report.addresses.is_empty());
        assert!(scanner.prober.probed.borrow().is_empty());
    }

    #[test]
    fn test_unknown_interface() {
        let scanner = Scanner::new(lan(), FakeProber::free(&[]), window(50, 60));
        assert!(matches!(
            scanner.scan_free("wlan0", 1),
            Err(ScanError::UnknownInterface { interface }) if interface == "wlan0"
        ));
    }

    #[test]
    fn test_probe_failure_aborts_scan() {
        let scanner = Scanner::new(lan(), BrokenProber, window(50, 60));
        assert!(matches!(scanner.scan_free("eth0", 1), Err(ScanError::Probe { .. })));
    }

    #[test]
    fn test_invalid_windows_rejected() {
        assert!(ScanConfig::new(60, 50, DEFAULT_PROBE_TIMEOUT).is_err());
        assert!(ScanConfig::new(50, 50, DEFAULT_PROBE_TIMEOUT).is_err());
        assert!(ScanConfig::new(0, 257, DEFAULT_PROBE_TIMEOUT).is_err());
        assert_eq!(window(250, 256).hosts().collect::<Vec<_>>(), vec![250, 251, 252, 253, 254, 255]);
    }

    #[test]
    fn test_free_addresses_are_audited() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::new(dir.path().join(".freeips"));
        let scanner = Scanner::new(lan(), FakeProber::free(&[51, 53]), window(50, 60))
            .with_audit_log(audit.clone());

        scanner.scan_free("eth0", 2).unwrap();
        let content = std::fs::read_to_string(audit.path()).unwrap();
        assert_eq!(content, "192.168.1.51/24\n192.168.1.53/24\n");
    }

    #[test]
    fn test_short_scan_is_still_audited() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::new(dir.path().join(".freeips"));
        let scanner = Scanner::new(lan(), FakeProber::free(&[52, 57]), window(50, 60))
            .with_audit_log(audit.clone());

        let report = scanner.scan_free("eth0", 5).unwrap();
        assert!(!report.is_complete());
        let content = std::fs::read_to_string(audit.path()).unwrap();
        assert_eq!(content, "192.168.1.52/24\n192.168.1.57/24\n");
    }

    #[test]
    fn test_ping_error_after_finds_writes_no_audit() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::new(dir.path().join(".freeips"));
        let scanner = Scanner::new(lan(), FailingProber { fails_at: 53 }, window(50, 60))
            .with_audit_log(audit.clone());

        let err = scanner.scan_free("eth0", 5).unwrap_err();
        assert!(matches!(err, ScanError::Probe { address, .. } if address == Ipv4Addr::new(192, 168, 1, 53)));
        assert!(!audit.path().exists());
    }
}

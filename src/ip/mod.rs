//! Free address discovery.
//!
//! This module finds unused IPv4 addresses on the subnet of a local
//! interface by probing candidates one after another, and records what
//! it found in an append-only audit log.

pub mod audit;
pub mod interface;
pub mod probe;
pub mod scanner;
pub mod subnet;

// Re-export commonly used types
pub use audit::AuditLog;
pub use interface::{InterfaceAddress, InterfaceResolver, SystemInterfaces};
pub use probe::{PingProber, Prober};
pub use scanner::{AddressPoolExhausted, ScanConfig, ScanError, ScanReport, Scanner, DEFAULT_PROBE_TIMEOUT};
pub use subnet::{netmask_bits, CidrParseError, HostAddress, SubnetDescriptor};

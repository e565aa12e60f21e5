//! Liveness probing for candidate addresses.
//!
//! A candidate is considered free when a single echo request goes
//! unanswered. This is a heuristic: hosts that drop ICMP look free too,
//! and nothing stops another host from claiming the address afterwards.

use log::debug;
use std::io;
use std::net::Ipv4Addr;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Something that can tell whether a host answers on the network
pub trait Prober {
    /// Returns `Ok(true)` if the host responded
    fn is_alive(&self, address: Ipv4Addr) -> io::Result<bool>;
}

/// Probes with the system `ping` binary, one packet per candidate
#[derive(Debug, Clone)]
pub struct PingProber {
    timeout: Duration,
}

impl PingProber {
    pub fn new(timeout: Duration) -> Self {
        PingProber { timeout }
    }

    /// Whole seconds passed to `ping -W`, never below one
    fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs().max(1)
    }
}

impl Prober for PingProber {
    fn is_alive(&self, address: Ipv4Addr) -> io::Result<bool> {
        let status = Command::new("ping")
            .args(["-c", "1", "-W", &self.timeout_secs().to_string()])
            .arg(address.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        debug!("ping {} -> {}", address, status);
        Ok(status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_rounds_to_at_least_one_second() {
        assert_eq!(PingProber::new(Duration::from_millis(200)).timeout_secs(), 1);
        assert_eq!(PingProber::new(Duration::from_secs(3)).timeout_secs(), 3);
    }
}

//! Append-only record of addresses found free by a scan.

use super::subnet::HostAddress;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Plain-text audit file, one `address/cidr` per line
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AuditLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per address, creating the file and its directory if needed
    pub fn append(&self, addresses: &[HostAddress]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        for address in addresses {
            writeln!(file, "{}", address.cidr())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    #[test]
    fn test_append_keeps_previous_runs() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path().join("var").join(".freeips"));

        log.append(&[HostAddress::new(Ipv4Addr::new(10, 0, 0, 5), 24)]).unwrap();
        log.append(&[
            HostAddress::new(Ipv4Addr::new(10, 0, 0, 6), 24),
            HostAddress::new(Ipv4Addr::new(10, 0, 0, 7), 24),
        ])
        .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "10.0.0.5/24\n10.0.0.6/24\n10.0.0.7/24\n");
    }
}

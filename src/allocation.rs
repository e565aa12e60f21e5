//! Binding of variable names to allocated addresses.
//!
//! Pairing is positional: the i-th variable receives the i-th address.
//! The resulting [`Allocation`] keeps that order, so everything derived
//! from it (netplan entries, `.env` lines) is deterministic.

use crate::ip::HostAddress;
use chrono::{DateTime, Utc};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// Errors binding variables to addresses
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("{names} variable(s) but {addresses} address(es)")]
    LengthMismatch { names: usize, addresses: usize },

    #[error("variable '{0}' listed more than once")]
    DuplicateName(String),
}

/// One variable and the address it was given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub variable: String,
    pub address: Ipv4Addr,
    /// `address/prefix` as written to netplan
    pub cidr: String,
}

/// Ordered, name-unique set of allocation records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation {
    records: Vec<AllocationRecord>,
}

impl Allocation {
    pub fn get(&self, variable: &str) -> Option<&AllocationRecord> {
        self.records.iter().find(|record| record.variable == variable)
    }

    pub fn records(&self) -> &[AllocationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// CIDR strings in binding order
    pub fn cidrs(&self) -> Vec<String> {
        self.records.iter().map(|record| record.cidr.clone()).collect()
    }
}

/// Pair `names[i]` with `addresses[i]`.
///
/// Lists of different length are rejected rather than truncated.
pub fn bind_variables(names: &[String], addresses: &[HostAddress]) -> Result<Allocation, BindError> {
    if names.len() != addresses.len() {
        return Err(BindError::LengthMismatch {
            names: names.len(),
            addresses: addresses.len(),
        });
    }

    check_unique_names(names)?;

    let records = names
        .iter()
        .zip(addresses)
        .map(|(name, address)| AllocationRecord {
            variable: name.clone(),
            address: address.ip(),
            cidr: address.cidr(),
        })
        .collect();
    Ok(Allocation { records })
}

/// Reject a variable list that names the same variable twice
pub fn check_unique_names(names: &[String]) -> Result<(), BindError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(BindError::DuplicateName(name.clone()));
        }
    }
    Ok(())
}

/// What a `start` run allocated, kept on disk so `stop` can undo it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub generated_at: DateTime<Utc>,
    pub interface: String,
    pub netplan_file: PathBuf,
    pub allocation: Allocation,
}

impl AllocationReport {
    pub fn new(interface: &str, netplan_file: &Path, allocation: Allocation) -> Self {
        AllocationReport {
            generated_at: Utc::now(),
            interface: interface.to_string(),
            netplan_file: netplan_file.to_path_buf(),
            allocation,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory '{}'", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).wrap_err_with(|| format!("Failed to write allocation record '{}'", path.display()))?;
        for record in self.allocation.records() {
            info!("Allocated {} = {}", record.variable, record.cidr);
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read allocation record '{}'", path.display()))?;
        let report = serde_json::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse allocation record '{}'", path.display()))?;
        Ok(report)
    }
}

use crate::ip::{ScanConfig, ScanError, DEFAULT_PROBE_TIMEOUT};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

/// Variable holding the shared services address, always allocated first
pub const SERVICES_IP_VAR: &str = "services_ip";

static VARIABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid variable name regex")
});

/// Errors in `etc/settings.yaml`
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    ScanWindow(#[from] ScanError),

    #[error("service '{service}': ip_var '{name}' is not a valid variable name")]
    InvalidIpVar { service: String, name: String },

    #[error("invalid key '{key}' in {section}: keys must be valid variable names")]
    InvalidKey { section: String, key: String },
}

/// Top-level structure of `etc/settings.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Scan window and values exported to every service
    pub general: General,
    /// Per-service settings keyed by service name
    #[serde(default)]
    pub services: BTreeMap<String, ServiceSettings>,
}

/// The `general` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct General {
    /// First host octet to probe (inclusive)
    pub start_host: u16,
    /// Last host octet to probe (exclusive, at most 256)
    pub end_host: u16,
    /// How long to wait for an echo reply (e.g. "1s", "500ms")
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,
    /// Any other key, exported to `.env`
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Settings for one service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Variable that receives this service's address; services may share one
    pub ip_var: String,
    /// Any other key, exported to `.env`
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_probe_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}

impl Settings {
    /// Check the scan window and every name that ends up in `.env`
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.scan_config()?;

        for key in self.general.extra.keys() {
            check_key("general", key)?;
        }
        for (service, settings) in &self.services {
            if !is_valid_variable_name(&settings.ip_var) {
                return Err(SettingsError::InvalidIpVar {
                    service: service.clone(),
                    name: settings.ip_var.clone(),
                });
            }
            for key in settings.extra.keys() {
                check_key(service, key)?;
            }
        }
        Ok(())
    }

    /// Scanner configuration from the `general` section
    pub fn scan_config(&self) -> Result<ScanConfig, ScanError> {
        ScanConfig::new(self.general.start_host, self.general.end_host, self.general.probe_timeout)
    }

    /// Variables needing an address for `services`, in binding order.
    ///
    /// `services_ip` comes first, then each service's `ip_var` in the order
    /// given, without repeats.
    pub fn ip_variables(&self, services: &[String]) -> Vec<String> {
        let mut vars = vec![SERVICES_IP_VAR.to_string()];
        for name in services {
            if let Some(settings) = self.services.get(name) {
                if !vars.contains(&settings.ip_var) {
                    vars.push(settings.ip_var.clone());
                }
            }
        }
        vars
    }
}

fn check_key(section: &str, key: &str) -> Result<(), SettingsError> {
    if is_valid_variable_name(key) {
        Ok(())
    } else {
        Err(SettingsError::InvalidKey {
            section: section.to_string(),
            key: key.to_string(),
        })
    }
}

pub fn is_valid_variable_name(name: &str) -> bool {
    VARIABLE_NAME.is_match(name)
}

/// File locations relative to a project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Layout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("etc").join("settings.yaml")
    }

    pub fn base_compose_file(&self) -> PathBuf {
        self.root.join("etc").join("base-compose.yml")
    }

    pub fn services_dir(&self) -> PathBuf {
        self.root.join("etc").join("services")
    }

    /// `etc/services/<name>/<name>.yml`
    pub fn service_file(&self, name: &str) -> PathBuf {
        self.services_dir().join(name).join(format!("{}.yml", name))
    }

    pub fn var_dir(&self) -> PathBuf {
        self.root.join("var")
    }

    /// Append-only list of addresses found free
    pub fn audit_log(&self) -> PathBuf {
        self.var_dir().join(".freeips")
    }

    pub fn allocation_record(&self) -> PathBuf {
        self.var_dir().join("allocations.json")
    }

    pub fn compose_output(&self) -> PathBuf {
        self.root.join("docker-compose.yml")
    }

    pub fn env_output(&self) -> PathBuf {
        self.root.join(".env")
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::new(".")
    }
}

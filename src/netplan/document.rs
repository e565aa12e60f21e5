//! In-memory netplan document.
//!
//! The whole YAML tree is kept as a [`serde_yaml::Value`] so keys this
//! crate does not manage survive a load/save round trip. Only
//! `network.ethernets.<interface>.addresses` is ever touched.

use serde_yaml::{Mapping, Value};

const ADDRESSES_KEY: &str = "addresses";

/// Errors reading, writing or interpreting a netplan document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("interface '{interface}' not found under network.ethernets in {location}")]
    UnknownInterface { interface: String, location: String },

    #[error("malformed netplan document {location}: {reason}")]
    Malformed { location: String, reason: String },

    #[error("failed to read netplan document {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write netplan document {location}: {source}")]
    Write {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

/// A parsed netplan configuration and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct NetplanDocument {
    root: Value,
    location: String,
}

impl NetplanDocument {
    /// Parse YAML text. The top level must be a mapping.
    pub fn from_yaml_str(content: &str, location: impl Into<String>) -> Result<Self, DocumentError> {
        let location = location.into();
        let root: Value = serde_yaml::from_str(content).map_err(|e| DocumentError::Malformed {
            location: location.clone(),
            reason: e.to_string(),
        })?;
        if !root.is_mapping() {
            return Err(DocumentError::Malformed {
                location,
                reason: "top level is not a mapping".to_string(),
            });
        }
        Ok(NetplanDocument { root, location })
    }

    pub fn to_yaml_string(&self) -> Result<String, DocumentError> {
        serde_yaml::to_string(&self.root).map_err(|e| DocumentError::Malformed {
            location: self.location.clone(),
            reason: e.to_string(),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Addresses currently configured on `interface`, in document order
    pub fn addresses(&self, interface: &str) -> Result<Vec<String>, DocumentError> {
        let ethernets = self
            .root
            .get("network")
            .and_then(|network| network.get("ethernets"))
            .and_then(Value::as_mapping)
            .ok_or_else(|| self.malformed("missing network.ethernets mapping"))?;
        let entry = ethernets
            .get(interface)
            .ok_or_else(|| self.unknown_interface(interface))?;
        match entry.get(ADDRESSES_KEY) {
            None => Ok(Vec::new()),
            Some(Value::Sequence(seq)) => seq
                .iter()
                .map(|value| {
                    value
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.malformed(&format!("non-string entry in {}.addresses", interface)))
                })
                .collect(),
            Some(_) => Err(self.malformed(&format!("{}.addresses is not a list", interface))),
        }
    }

    /// Append each address not already present. Returns the ones appended.
    pub fn add_addresses(&mut self, interface: &str, addresses: &[String]) -> Result<Vec<String>, DocumentError> {
        let list = self.addresses_mut(interface)?;
        let mut added = Vec::new();
        for address in addresses {
            if !list.iter().any(|value| value.as_str() == Some(address.as_str())) {
                list.push(Value::String(address.clone()));
                added.push(address.clone());
            }
        }
        Ok(added)
    }

    /// Remove one occurrence of each address that is present. Returns the ones removed.
    pub fn remove_addresses(&mut self, interface: &str, addresses: &[String]) -> Result<Vec<String>, DocumentError> {
        let list = self.addresses_mut(interface)?;
        let mut removed = Vec::new();
        for address in addresses {
            if let Some(pos) = list.iter().position(|value| value.as_str() == Some(address.as_str())) {
                list.remove(pos);
                removed.push(address.clone());
            }
        }
        Ok(removed)
    }

    fn addresses_mut(&mut self, interface: &str) -> Result<&mut Vec<Value>, DocumentError> {
        let location = self.location.clone();
        let malformed = |reason: String| DocumentError::Malformed {
            location: location.clone(),
            reason,
        };

        let ethernets = self
            .root
            .get_mut("network")
            .and_then(|network| network.get_mut("ethernets"))
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| malformed("missing network.ethernets mapping".to_string()))?;
        let entry = ethernets
            .get_mut(interface)
            .ok_or_else(|| DocumentError::UnknownInterface {
                interface: interface.to_string(),
                location: location.clone(),
            })?;

        // `eth0:` with no body parses as null
        if entry.is_null() {
            *entry = Value::Mapping(Mapping::new());
        }
        let entry = entry
            .as_mapping_mut()
            .ok_or_else(|| malformed(format!("{} is not a mapping", interface)))?;

        let list = entry
            .entry(Value::String(ADDRESSES_KEY.to_string()))
            .or_insert(Value::Sequence(Vec::new()))
            .as_sequence_mut()
            .ok_or_else(|| malformed(format!("{}.addresses is not a list", interface)))?;
        if list.iter().any(|value| !value.is_string()) {
            return Err(malformed(format!("non-string entry in {}.addresses", interface)));
        }
        Ok(list)
    }

    fn malformed(&self, reason: &str) -> DocumentError {
        DocumentError::Malformed {
            location: self.location.clone(),
            reason: reason.to_string(),
        }
    }

    fn unknown_interface(&self, interface: &str) -> DocumentError {
        DocumentError::UnknownInterface {
            interface: interface.to_string(),
            location: self.location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETPLAN: &str = r#"
network:
  version: 2
  renderer: networkd
  ethernets:
    eth0:
      dhcp4: false
      addresses:
        - 10.0.0.1/24
      gateway4: 10.0.0.254
      nameservers:
        addresses: [1.1.1.1]
"#;

    fn doc() -> NetplanDocument {
        NetplanDocument::from_yaml_str(NETPLAN, "test").unwrap()
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_skips_existing_entries() {
        let mut doc = doc();
        let added = doc.add_addresses("eth0", &list(&["10.0.0.1/24", "10.0.0.2/24"])).unwrap();
        assert_eq!(added, list(&["10.0.0.2/24"]));
        assert_eq!(doc.addresses("eth0").unwrap(), list(&["10.0.0.1/24", "10.0.0.2/24"]));
    }

    #[test]
    fn test_add_is_idempotent() {
        let addrs = list(&["10.0.0.2/24", "10.0.0.3/24", "10.0.0.2/24"]);
        let mut once = doc();
        once.add_addresses("eth0", &addrs).unwrap();
        let mut twice = once.clone();
        assert!(twice.add_addresses("eth0", &addrs).unwrap().is_empty());
        assert_eq!(once, twice);
        assert_eq!(once.addresses("eth0").unwrap(), list(&["10.0.0.1/24", "10.0.0.2/24", "10.0.0.3/24"]));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut doc = doc();
        let before = doc.clone();
        assert!(doc.remove_addresses("eth0", &list(&["10.0.0.9/24"])).unwrap().is_empty());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_remove_undoes_add_of_new_addresses() {
        let original = doc();
        let new = list(&["10.0.0.7/24", "10.0.0.8/24"]);
        let mut doc = original.clone();
        doc.add_addresses("eth0", &new).unwrap();
        doc.remove_addresses("eth0", &new).unwrap();
        assert_eq!(doc, original);
    }

    #[test]
    fn test_unrelated_keys_survive() {
        let mut doc = doc();
        doc.add_addresses("eth0", &list(&["10.0.0.2/24"])).unwrap();
        let reparsed = NetplanDocument::from_yaml_str(&doc.to_yaml_string().unwrap(), "test").unwrap();
        let eth0 = &reparsed.root()["network"]["ethernets"]["eth0"];
        assert_eq!(eth0["gateway4"].as_str(), Some("10.0.0.254"));
        assert_eq!(eth0["nameservers"]["addresses"][0].as_str(), Some("1.1.1.1"));
        assert_eq!(reparsed.root()["network"]["renderer"].as_str(), Some("networkd"));
        assert_eq!(reparsed.addresses("eth0").unwrap(), list(&["10.0.0.1/24", "10.0.0.2/24"]));
    }

    #[test]
    fn test_missing_addresses_key_starts_empty() {
        let mut doc = NetplanDocument::from_yaml_str(
            "network:\n  ethernets:\n    eth1:\n      dhcp4: true\n    eth2:\n",
            "test",
        )
        .unwrap();
        assert!(doc.addresses("eth1").unwrap().is_empty());
        doc.add_addresses("eth1", &list(&["10.1.0.5/16"])).unwrap();
        doc.add_addresses("eth2", &list(&["10.2.0.5/16"])).unwrap();
        assert_eq!(doc.addresses("eth1").unwrap(), list(&["10.1.0.5/16"]));
        assert_eq!(doc.addresses("eth2").unwrap(), list(&["10.2.0.5/16"]));
    }

    #[test]
    fn test_unknown_interface() {
        let mut doc = doc();
        assert!(matches!(
            doc.add_addresses("wlan0", &list(&["10.0.0.2/24"])),
            Err(DocumentError::UnknownInterface { .. })
        ));
        assert!(matches!(doc.addresses("wlan0"), Err(DocumentError::UnknownInterface { .. })));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            NetplanDocument::from_yaml_str("- just\n- a list\n", "test"),
            Err(DocumentError::Malformed { .. })
        ));

        let mut no_ethernets = NetplanDocument::from_yaml_str("network:\n  version: 2\n", "test").unwrap();
        assert!(matches!(
            no_ethernets.add_addresses("eth0", &list(&["10.0.0.2/24"])),
            Err(DocumentError::Malformed { .. })
        ));

        let ethernets_list = NetplanDocument::from_yaml_str(
            "network:\n  ethernets:\n    - eth0\n",
            "test",
        )
        .unwrap();
        assert!(matches!(ethernets_list.addresses("eth0"), Err(DocumentError::Malformed { .. })));
        let mut ethernets_list_mut = ethernets_list.clone();
        assert!(matches!(
            ethernets_list_mut.add_addresses("eth0", &list(&["10.0.0.2/24"])),
            Err(DocumentError::Malformed { .. })
        ));

        let mut scalar_list = NetplanDocument::from_yaml_str(
            "network:\n  ethernets:\n    eth0:\n      addresses: 10.0.0.1/24\n",
            "test",
        )
        .unwrap();
        assert!(matches!(
            scalar_list.remove_addresses("eth0", &list(&["10.0.0.1/24"])),
            Err(DocumentError::Malformed { .. })
        ));
    }
}

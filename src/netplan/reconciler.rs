//! Load-mutate-save reconciliation of interface addresses.

use super::document::{DocumentError, NetplanDocument};
use super::store::DocumentStore;
use log::{debug, info};

/// Outcome of a reconcile call
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The document after the mutation
    pub document: NetplanDocument,
    /// Addresses that were actually added or removed
    pub changed: Vec<String>,
}

/// Applies idempotent address changes to a stored netplan document
pub struct Reconciler<S> {
    store: S,
}

impl<S: DocumentStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Reconciler { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Append addresses missing from `interface` and persist the result
    pub fn add_addresses(&mut self, interface: &str, addresses: &[String]) -> Result<Reconciliation, DocumentError> {
        let mut document = self.store.load()?;
        let changed = document.add_addresses(interface, addresses)?;
        for address in &changed {
            info!("Adding {} to {} in {}", address, interface, self.store.location());
        }
        self.persist(document, changed)
    }

    /// Remove addresses present on `interface` and persist the result
    pub fn remove_addresses(&mut self, interface: &str, addresses: &[String]) -> Result<Reconciliation, DocumentError> {
        let mut document = self.store.load()?;
        let changed = document.remove_addresses(interface, addresses)?;
        for address in &changed {
            info!("Removing {} from {} in {}", address, interface, self.store.location());
        }
        self.persist(document, changed)
    }

    fn persist(&mut self, document: NetplanDocument, changed: Vec<String>) -> Result<Reconciliation, DocumentError> {
        if changed.is_empty() {
            debug!("{} already up to date", self.store.location());
        } else {
            self.store.save(&document)?;
        }
        Ok(Reconciliation { document, changed })
    }
}

//! Netplan document handling.
//!
//! Reads and writes `network.ethernets.<interface>.addresses` in a netplan
//! YAML file while leaving every other key as it was, and applies the
//! result to the running system with `netplan apply`.

pub mod apply;
pub mod document;
pub mod reconciler;
pub mod store;

pub use apply::apply_netplan;
pub use document::{DocumentError, NetplanDocument};
pub use reconciler::{Reconciler, Reconciliation};
pub use store::{DocumentStore, FileStore, MemoryStore};

//! # LanParty - free address allocation for LAN party services
//!
//! This library finds unused IPv4 addresses on the local subnet, adds them
//! to a netplan configuration and derives per-service configuration from
//! the result.
//!
//! ## Overview
//!
//! A run requests one address per address variable (`services_ip` plus the
//! `ip_var` of every selected service). Addresses are found by pinging
//! candidates in a configured host window, bound to the variables in
//! order, written into `network.ethernets.<interface>.addresses` and then
//! exported to `docker-compose.yml` and `.env`.
//!
//! ## Architecture
//!
//! - `ip`: subnet description, probing and the sequential free-address scanner
//! - `netplan`: netplan document, document stores and the reconciler
//! - `allocation`: positional binding of variables to addresses
//! - `config`: settings file structures and the project layout
//! - `config_loader`: settings loading and service selection
//! - `services`: compose and environment file generation
//! - `orchestrator`: the `start`, `stop` and `addresses` workflows
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lanparty::config::Layout;
//! use lanparty::orchestrator::{start, StartOptions};
//!
//! let options = StartOptions {
//!     interface: "eth0".to_string(),
//!     netplan_file: "/etc/netplan/01-netcfg.yaml".into(),
//!     services: Vec::new(),
//!     apply: true,
//! };
//! let allocation = start(&Layout::new("."), &options)?;
//! for record in allocation.records() {
//!     println!("{}={}", record.variable, record.address);
//! }
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Limitations
//!
//! - A free address is one that does not answer a ping. Hosts that drop
//!   ICMP look free, and nothing reserves an address between the scan and
//!   `netplan apply`.
//! - The netplan file is read and rewritten without locking; only one
//!   process may reconcile a given file at a time.
//!
//! ## Error Handling
//!
//! Library modules return typed errors (`ScanError`, `DocumentError`,
//! `BindError`, `SettingsError`). The workflows in `orchestrator` wrap
//! them in `color_eyre` reports with context.

pub mod allocation;
pub mod config;
pub mod config_loader;
pub mod ip;
pub mod netplan;
pub mod orchestrator;
pub mod services;

//! Run orchestration.
//!
//! This module coordinates a full run: loading settings, scanning for
//! free addresses, reconciling them into the netplan document, applying
//! it and writing the service configuration. The steps run strictly one
//! after another.

use crate::allocation::{bind_variables, check_unique_names, Allocation, AllocationReport};
use crate::config::{Layout, Settings};
use crate::config_loader::{discover_services, load_settings, select_services};
use crate::ip::{AuditLog, HostAddress, InterfaceResolver, PingProber, Prober, Scanner, SystemInterfaces};
use crate::netplan::{apply_netplan, DocumentStore, FileStore, Reconciler};
use crate::services::{build_compose, render_env, write_compose, write_env};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Inputs for `start`
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub interface: String,
    pub netplan_file: PathBuf,
    /// Services to start; empty means every configured service
    pub services: Vec<String>,
    /// Run `netplan apply` after reconciling
    pub apply: bool,
}

/// Inputs for `stop`; unset fields are taken from the allocation record
#[derive(Debug, Clone, Default)]
pub struct StopOptions {
    pub interface: Option<String>,
    pub netplan_file: Option<PathBuf>,
    pub apply: bool,
}

/// Whether `addresses` adds or removes entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressAction {
    Add,
    Remove,
}

/// Scan for one address per variable and bind them, without touching the document.
///
/// Variable names and the document's `interface` entry are checked before
/// probing starts. A short scan returns [`crate::ip::AddressPoolExhausted`].
pub fn scan_and_bind<R, P, S>(
    scanner: &Scanner<R, P>,
    reconciler: &Reconciler<S>,
    interface: &str,
    variables: &[String],
) -> Result<Allocation>
where
    R: InterfaceResolver,
    P: Prober,
    S: DocumentStore,
{
    check_unique_names(variables)?;
    let existing = reconciler.store().load()?.addresses(interface)?;
    info!("{} currently has {} address(es) in {}", interface, existing.len(), reconciler.store().location());

    let report = scanner.scan_free(interface, variables.len())?.ensure_complete()?;
    let allocation = bind_variables(variables, &report.addresses)?;
    Ok(allocation)
}

/// Scan for one address per variable, bind them and add them to the document.
///
/// The document is only written once every variable has an address.
pub fn allocate<R, P, S>(
    scanner: &Scanner<R, P>,
    reconciler: &mut Reconciler<S>,
    interface: &str,
    variables: &[String],
) -> Result<Allocation>
where
    R: InterfaceResolver,
    P: Prober,
    S: DocumentStore,
{
    let allocation = scan_and_bind(scanner, reconciler, interface, variables)?;
    reconciler.add_addresses(interface, &allocation.cidrs())?;
    Ok(allocation)
}

/// Allocate addresses for the selected services and write their configuration
pub fn start(layout: &Layout, options: &StartOptions) -> Result<Allocation> {
    let settings = load_settings(&layout.settings_file())?;
    let scan_config = settings.scan_config()?;
    let scanner = Scanner::new(SystemInterfaces, PingProber::new(scan_config.probe_timeout()), scan_config)
        .with_audit_log(AuditLog::new(layout.audit_log()));
    start_with_scanner(layout, options, &settings, &scanner)
}

/// `start` with an explicit scanner.
///
/// Refuses to run while an allocation record from an earlier `start`
/// exists. The record is written before the netplan document, so every
/// address added to the document is covered by a record `stop` can read.
pub fn start_with_scanner<R, P>(
    layout: &Layout,
    options: &StartOptions,
    settings: &Settings,
    scanner: &Scanner<R, P>,
) -> Result<Allocation>
where
    R: InterfaceResolver,
    P: Prober,
{
    let record_path = layout.allocation_record();
    if record_path.exists() {
        return Err(eyre!(
            "Addresses from a previous start are still recorded in '{}'; run stop first",
            record_path.display()
        ));
    }

    let discovered = discover_services(layout)?;
    let services = select_services(settings, &discovered, &options.services)?;
    info!("Starting services: {}", services.join(", "));

    let variables = settings.ip_variables(&services);
    let mut reconciler = Reconciler::new(FileStore::new(&options.netplan_file));

    let allocation = scan_and_bind(scanner, &reconciler, &options.interface, &variables)
        .wrap_err_with(|| format!("Failed to allocate addresses on '{}'", options.interface))?;

    AllocationReport::new(&options.interface, &options.netplan_file, allocation.clone()).save(&record_path)?;

    if let Err(err) = reconciler.add_addresses(&options.interface, &allocation.cidrs()) {
        if let Err(remove_err) = fs::remove_file(&record_path) {
            warn!("Failed to remove allocation record '{}': {}", record_path.display(), remove_err);
        }
        return Err(err).wrap_err_with(|| format!("Failed to add addresses to '{}'", options.netplan_file.display()));
    }

    if options.apply {
        apply_netplan()?;
    } else {
        warn!("Skipping 'netplan apply'; addresses are not active yet");
    }

    let service_files: Vec<PathBuf> = services.iter().map(|name| layout.service_file(name)).collect();
    let service_paths: Vec<&Path> = service_files.iter().map(PathBuf::as_path).collect();
    let compose = build_compose(&layout.base_compose_file(), &service_paths)?;
    write_compose(&compose, &layout.compose_output())?;

    let env = render_env(settings, &services, &allocation)?;
    write_env(&env, &layout.env_output())?;

    info!("Started {} service(s) with {} address(es)", services.len(), allocation.len());
    Ok(allocation)
}

/// Remove the addresses recorded by the last `start` from the document
pub fn stop(layout: &Layout, options: &StopOptions) -> Result<Vec<String>> {
    let record_path = layout.allocation_record();
    let report = AllocationReport::load(&record_path)?;
    let interface = options.interface.as_deref().unwrap_or(&report.interface);
    let netplan_file = options.netplan_file.as_deref().unwrap_or(&report.netplan_file);
    info!("Releasing {} address(es) allocated at {}", report.allocation.len(), report.generated_at);

    let mut reconciler = Reconciler::new(FileStore::new(netplan_file));
    let result = reconciler
        .remove_addresses(interface, &report.allocation.cidrs())
        .wrap_err_with(|| format!("Failed to release addresses on '{}'", interface))?;

    if options.apply {
        apply_netplan()?;
    }

    fs::remove_file(&record_path)
        .wrap_err_with(|| format!("Failed to remove allocation record '{}'", record_path.display()))?;
    Ok(result.changed)
}

/// Add or remove literal `a.b.c.d/nn` entries on an interface
pub fn update_addresses(netplan_file: &Path, interface: &str, action: AddressAction, addresses: &[String]) -> Result<Vec<String>> {
    for address in addresses {
        address.parse::<HostAddress>()?;
    }

    let mut reconciler = Reconciler::new(FileStore::new(netplan_file));
    let result = match action {
        AddressAction::Add => reconciler.add_addresses(interface, addresses)?,
        AddressAction::Remove => reconciler.remove_addresses(interface, addresses)?,
    };
    if result.changed.is_empty() {
        info!("No changes to {}", netplan_file.display());
    }
    Ok(result.changed)
}

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::info;
use std::process::Command;

/// Run `netplan apply` so the running system picks up the document
pub fn apply_netplan() -> Result<()> {
    info!("Applying netplan configuration...");
    let status = Command::new("netplan")
        .arg("apply")
        .status()
        .wrap_err("Failed to run 'netplan apply'")?;
    if !status.success() {
        return Err(eyre!("'netplan apply' exited with {}", status));
    }
    Ok(())
}

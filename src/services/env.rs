//! `.env` generation from an allocation and the settings file.

use crate::allocation::Allocation;
use crate::config::{Settings, SERVICES_IP_VAR};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::info;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

fn scalar_to_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(eyre!("setting '{}' must be a scalar to be exported", key)),
    }
}

fn line(key: &str, value: &str) -> String {
    format!("{}={}", key.to_uppercase(), value)
}

/// Render `KEY=value` lines for the selected services.
///
/// Order: the shared services address, each service's address variable,
/// each service's remaining settings, then the extra `general` settings.
pub fn render_env(settings: &Settings, services: &[String], allocation: &Allocation) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    let services_ip = allocation
        .get(SERVICES_IP_VAR)
        .ok_or_else(|| eyre!("no address allocated for '{}'", SERVICES_IP_VAR))?;
    lines.push(line(SERVICES_IP_VAR, &services_ip.address.to_string()));

    for name in services {
        let service = settings
            .services
            .get(name)
            .ok_or_else(|| eyre!("service '{}' has no entry in settings", name))?;
        let record = allocation
            .get(&service.ip_var)
            .ok_or_else(|| eyre!("no address allocated for '{}'", service.ip_var))?;
        let entry = line(&service.ip_var, &record.address.to_string());
        if !lines.contains(&entry) {
            lines.push(entry);
        }
    }

    for name in services {
        if let Some(service) = settings.services.get(name) {
            for (key, value) in &service.extra {
                lines.push(line(key, &scalar_to_string(key, value)?));
            }
        }
    }

    for (key, value) in &settings.general.extra {
        lines.push(line(key, &scalar_to_string(key, value)?));
    }

    Ok(lines)
}

pub fn write_env(lines: &[String], output: &Path) -> Result<()> {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(output, content).wrap_err_with(|| format!("Failed to write '{}'", output.display()))?;
    info!("Generated environment file: {:?}", output);
    Ok(())
}

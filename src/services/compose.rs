//! `docker-compose.yml` generation.

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::info;
use serde_yaml::{Mapping, Value};
use std::fs::{self, File};
use std::path::Path;

fn read_yaml(path: &Path) -> Result<Value> {
    let file = File::open(path).wrap_err_with(|| format!("Failed to open '{}'", path.display()))?;
    serde_yaml::from_reader(file).wrap_err_with(|| format!("Failed to parse '{}'", path.display()))
}

/// Merge the top-level entries of `service` into `compose.services`.
///
/// Later services replace earlier entries with the same key.
pub fn merge_service(compose: &mut Value, service: Value) -> Result<()> {
    let root = compose
        .as_mapping_mut()
        .ok_or_else(|| eyre!("base compose file is not a mapping"))?;
    let services = root
        .entry(Value::String("services".to_string()))
        .or_insert(Value::Mapping(Mapping::new()));
    if services.is_null() {
        *services = Value::Mapping(Mapping::new());
    }
    let services = services
        .as_mapping_mut()
        .ok_or_else(|| eyre!("'services' in base compose file is not a mapping"))?;

    let entries = match service {
        Value::Mapping(entries) => entries,
        Value::Null => return Ok(()),
        _ => return Err(eyre!("service definition is not a mapping")),
    };
    for (key, value) in entries {
        services.insert(key, value);
    }
    Ok(())
}

/// Build the compose document from the base file and one file per service
pub fn build_compose(base_file: &Path, service_files: &[&Path]) -> Result<Value> {
    let mut compose = read_yaml(base_file)?;
    for path in service_files {
        let service = read_yaml(path)?;
        merge_service(&mut compose, service).wrap_err_with(|| format!("Failed to merge '{}'", path.display()))?;
    }
    Ok(compose)
}

pub fn write_compose(compose: &Value, output: &Path) -> Result<()> {
    let content = serde_yaml::to_string(compose)?;
    fs::write(output, content).wrap_err_with(|| format!("Failed to write '{}'", output.display()))?;
    info!("Generated compose file: {:?}", output);
    Ok(())
}

use crate::config::{Layout, Settings};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{info, warn};
use std::fs::{self, File};
use std::path::Path;

/// Load and validate `etc/settings.yaml`
pub fn load_settings(settings_path: &Path) -> Result<Settings> {
    info!("Loading settings from: {:?}", settings_path);

    let file = File::open(settings_path)
        .wrap_err_with(|| format!("Failed to open settings file '{}'", settings_path.display()))?;
    let settings: Settings = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse settings file '{}'", settings_path.display()))?;

    settings.validate()?;

    Ok(settings)
}

/// Names of the directories under `etc/services`, sorted
pub fn discover_services(layout: &Layout) -> Result<Vec<String>> {
    let services_dir = layout.services_dir();
    let mut found = Vec::new();
    for entry in fs::read_dir(&services_dir)
        .wrap_err_with(|| format!("Failed to list services in '{}'", services_dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            found.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    found.sort();
    Ok(found)
}

/// Pick the services to start.
///
/// With no explicit request every discovered service that has a settings
/// entry is used. Requested names must be both discovered and configured.
pub fn select_services(settings: &Settings, discovered: &[String], requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() || requested.iter().any(|name| name == "*") {
        let mut selected = Vec::new();
        for name in discovered {
            if settings.services.contains_key(name) {
                selected.push(name.clone());
            } else {
                warn!("Service '{}' has no entry in settings, skipping", name);
            }
        }
        return Ok(selected);
    }

    let mut selected = Vec::new();
    for name in requested {
        if !discovered.contains(name) {
            return Err(eyre!("Unknown service '{}' (found: {})", name, discovered.join(" ")));
        }
        if !settings.services.contains_key(name) {
            return Err(eyre!("Service '{}' has no entry in settings", name));
        }
        if !selected.contains(name) {
            selected.push(name.clone());
        }
    }
    selected.sort();
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const SETTINGS: &str = r#"
general:
  start_host: 100
  end_host: 200
services:
  minecraft:
    ip_var: game_ip
  teamspeak:
    ip_var: voice_ip
"#;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_settings() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", SETTINGS).unwrap();

        let settings = load_settings(temp_file.path()).unwrap();
        assert_eq!(settings.general.start_host, 100);
        assert_eq!(settings.services.len(), 2);
    }

    #[test]
    fn test_load_rejects_invalid_window() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "general:\n  start_host: 20\n  end_host: 10\n").unwrap();
        assert!(load_settings(temp_file.path()).is_err());
    }

    #[test]
    fn test_discover_services() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        for name in ["teamspeak", "minecraft"] {
            fs::create_dir_all(layout.services_dir().join(name)).unwrap();
        }
        fs::write(layout.services_dir().join("README"), "not a service").unwrap();

        assert_eq!(discover_services(&layout).unwrap(), names(&["minecraft", "teamspeak"]));
    }

    #[test]
    fn test_select_services() {
        let settings: Settings = serde_yaml::from_str(SETTINGS).unwrap();
        let discovered = names(&["factorio", "minecraft", "teamspeak"]);

        assert_eq!(select_services(&settings, &discovered, &[]).unwrap(), names(&["minecraft", "teamspeak"]));
        assert_eq!(select_services(&settings, &discovered, &names(&["*"])).unwrap(), names(&["minecraft", "teamspeak"]));
        assert_eq!(
            select_services(&settings, &discovered, &names(&["teamspeak", "minecraft", "teamspeak"])).unwrap(),
            names(&["minecraft", "teamspeak"])
        );
        assert!(select_services(&settings, &discovered, &names(&["quake"])).is_err());
        assert!(select_services(&settings, &discovered, &names(&["factorio"])).is_err());
    }
}

//! Configuration module for anime-resolve
//!
//! Handles loading settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Environment variable naming an explicit settings file
pub const SETTINGS_PATH_ENV: &str = "PRECISE_SETTINGS_PATH";

/// Candidate settings files, in lookup order
pub fn settings_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        paths.push(PathBuf::from(path));
    }
    paths.push(PathBuf::from("settings.yml"));
    paths.push(PathBuf::from("config/settings.yml"));
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("anime-resolve/settings.yml"));
    }
    paths
}

/// Load settings from the first existing file, or use defaults.
///
/// Environment overrides are applied on top in every case.
pub fn load_settings() -> Result<Settings> {
    let mut settings = match settings_paths().into_iter().find(|p| p.exists()) {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)
                .with_context(|| format!("loading {}", path.display()))?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };
    settings.merge_env();
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_paths_order() {
        let paths = settings_paths();
        let local = paths
            .iter()
            .position(|p| p == &PathBuf::from("settings.yml"))
            .unwrap();
        let nested = paths
            .iter()
            .position(|p| p == &PathBuf::from("config/settings.yml"))
            .unwrap();
        assert!(local < nested);
    }

    #[test]
    fn test_shipped_settings_and_aliases_parse() {
        let settings = Settings::from_yaml_str(include_str!("../../config/settings.yml")).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.enabled_sources().len(), 3);
        assert!(settings.get_source("jikan").unwrap().enrich);
        assert_eq!(
            settings.aliases.path.as_deref(),
            Some(std::path::Path::new("config/aliases.yml"))
        );

        let aliases =
            crate::resolver::AliasTable::from_yaml_str(include_str!("../../config/aliases.yml"))
                .unwrap();
        assert_eq!(aliases.len(), 9);
    }
}

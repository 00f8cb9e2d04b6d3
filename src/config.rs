use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::cli::OutputFormat;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Inventory config used when `-i` is not given
    pub inventory: String,
    /// dict2ini quoting when `--no-quote` is not given
    pub quote: bool,
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inventory: "http_inventory.yml".to_string(),
            quote: true,
            format: OutputFormat::Json,
        }
    }
}

const DEFAULT_CONFIG_CONTENT: &str = r#"# http-inventory configuration
# CLI arguments override these values

# Inventory config file used when -i is not given
inventory: http_inventory.yml

# Quote string values in dict2ini output
quote: true

# Output format of dict2ini (json or yaml)
format: json
"#;

impl Config {
    fn config_path() -> Option<PathBuf> {
        dirs_or_home().map(|p| p.join("config.yml"))
    }

    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Read `path`, writing a commented default file there if it is missing.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            Self::create_default(path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!("failed to parse config {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                warn!("failed to read config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    fn create_default(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("could not create config dir {}: {e}", parent.display());
                return;
            }
        }
        if let Err(e) = fs::write(path, DEFAULT_CONFIG_CONTENT) {
            warn!("could not write default config to {}: {e}", path.display());
        }
    }
}

fn dirs_or_home() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("http-inventory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_parses_to_defaults() {
        let parsed: Config = serde_yaml::from_str(DEFAULT_CONFIG_CONTENT).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yml");
        assert_eq!(Config::load_from(&path), Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "quote: false\nformat: yaml\n").unwrap();
        let config = Config::load_from(&path);
        assert!(!config.quote);
        assert_eq!(config.format, OutputFormat::Yaml);
        assert_eq!(config.inventory, "http_inventory.yml");
    }

    #[test]
    fn test_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "quote: [unterminated\n").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }
}

use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Substring that marks a file as non-data; such files are never indexed.
pub const DEFAULT_SKIP_MARKER: &str = "_skip";

pub const SKIP_MARKER_ENV_VAR: &str = "BIDS_CATALOG_SKIP_MARKER";
pub const PARALLEL_ENV_VAR: &str = "BIDS_CATALOG_PARALLEL";
pub const FOLLOW_HIDDEN_ENV_VAR: &str = "BIDS_CATALOG_FOLLOW_HIDDEN";

pub const CONFIG_DIR_NAME: &str = "bids-catalog";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Scan options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Files whose name contains this substring are skipped. Empty disables skipping.
    pub skip_marker: String,
    /// Decode, validate and stat files on the rayon pool
    pub parallel: bool,
    /// Also index dot-files and dot-directories
    pub follow_hidden: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            skip_marker: DEFAULT_SKIP_MARKER.to_string(),
            parallel: true,
            follow_hidden: false,
        }
    }
}

impl CatalogConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| CatalogError::Config(format!("{}: {}", path.display(), e)))
    }

    /// `$XDG_CONFIG_HOME/bids-catalog/config.json` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Resolve configuration:
    /// 1. the explicit file, if given (it must exist)
    /// 2. the default config file, if present
    /// 3. built-in defaults
    ///
    /// Environment variables are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => {
                    log::debug!("Loading catalog config from {}", path.display());
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };
        config.apply_env()
    }

    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup (the environment in production).
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(marker) = lookup(SKIP_MARKER_ENV_VAR) {
            self.skip_marker = marker;
        }
        if let Some(value) = lookup(PARALLEL_ENV_VAR) {
            self.parallel = parse_flag(PARALLEL_ENV_VAR, &value)?;
        }
        if let Some(value) = lookup(FOLLOW_HIDDEN_ENV_VAR) {
            self.follow_hidden = parse_flag(FOLLOW_HIDDEN_ENV_VAR, &value)?;
        }
        Ok(self)
    }

    pub fn is_skipped(&self, file_name: &str) -> bool {
        !self.skip_marker.is_empty() && file_name.contains(&self.skip_marker)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CatalogError::Config(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.skip_marker, "_skip");
        assert!(config.parallel);
        assert!(!config.follow_hidden);
    }

    #[test]
    fn test_skip_marker() {
        let config = CatalogConfig::default();
        assert!(config.is_skipped("sub-01_ses-01_skip_eeg.vhdr"));
        assert!(!config.is_skipped("sub-01_ses-01_eeg.vhdr"));

        let disabled = CatalogConfig {
            skip_marker: String::new(),
            ..CatalogConfig::default()
        };
        assert!(!disabled.is_skipped("anything_skip"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (SKIP_MARKER_ENV_VAR, "IGNORE"),
            (PARALLEL_ENV_VAR, "false"),
        ]
        .into_iter()
        .collect();

        let config = CatalogConfig::default()
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.skip_marker, "IGNORE");
        assert!(!config.parallel);
        assert!(!config.follow_hidden);
    }

    #[test]
    fn test_bad_flag_override() {
        let result = CatalogConfig::default().apply_overrides(|name| {
            (name == PARALLEL_ENV_VAR).then(|| "sometimes".to_string())
        });
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }

    #[test]
    fn test_from_file_partial() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{ "parallel": false }"#).unwrap();

        let config = CatalogConfig::from_file(&path).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.skip_marker, DEFAULT_SKIP_MARKER);
    }

    #[test]
    fn test_from_file_invalid_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            CatalogConfig::from_file(&path),
            Err(CatalogError::Config(_))
        ));
    }
}

//! Runtime configuration loaded from `berry.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BerryError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BerryConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

/// Where and how often the file system is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Prefix of the per-user storage key.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Directory used by the on-disk key/value store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Trailing-edge debounce applied to saves, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub save_debounce_ms: u64,
}

/// Session defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// User whose tree is opened when none is given.
    #[serde(default = "default_user")]
    pub default_user: String,
}

/// Per-window navigation history settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NavigationConfig {
    /// Maximum entries kept per window; the oldest are dropped first.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_namespace() -> String {
    "berryos-fs".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(".berryos")
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_user() -> String {
    "guest".to_string()
}
fn default_history_limit() -> usize {
    100
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            data_dir: default_data_dir(),
            save_debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_user: default_user(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

impl BerryConfig {
    /// Parse a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.storage.namespace.trim().is_empty() {
            return Err(BerryError::Config(
                "storage.namespace must not be empty".to_string(),
            ));
        }
        if self.session.default_user.trim().is_empty() {
            return Err(BerryError::Config(
                "session.default_user must not be empty".to_string(),
            ));
        }
        if self.navigation.history_limit == 0 {
            return Err(BerryError::Config(
                "navigation.history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a configuration file, falling back to defaults when it is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {} -- using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Storage key holding `user`'s tree: `<namespace>-<user>`.
    pub fn storage_key(&self, user: &str) -> String {
        format!("{}-{user}", self.storage.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = BerryConfig::from_toml("").unwrap();
        assert_eq!(cfg.storage.namespace, "berryos-fs");
        assert_eq!(cfg.storage.save_debounce_ms, 500);
        assert_eq!(cfg.storage.data_dir, PathBuf::from(".berryos"));
        assert_eq!(cfg.session.default_user, "guest");
        assert_eq!(cfg.navigation.history_limit, 100);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = BerryConfig::from_toml("[storage]\nsave_debounce_ms = 250\n").unwrap();
        assert_eq!(cfg.storage.save_debounce_ms, 250);
        assert_eq!(cfg.storage.namespace, "berryos-fs");
    }

    #[test]
    fn storage_key_is_scoped_per_user() {
        let cfg = BerryConfig::from_toml("[storage]\nnamespace = \"berry\"\n").unwrap();
        assert_eq!(cfg.storage_key("alice"), "berry-alice");
        assert_eq!(cfg.storage_key("bob"), "berry-bob");
    }

    #[test]
    fn unusable_values_are_config_errors() {
        for text in [
            "[storage]\nnamespace = \"  \"\n",
            "[session]\ndefault_user = \"\"\n",
            "[navigation]\nhistory_limit = 0\n",
        ] {
            let err = BerryConfig::from_toml(text).unwrap_err();
            assert!(matches!(err, BerryError::Config(_)), "{text}: {err}");
        }
    }

    #[test]
    fn defaults_validate() {
        assert!(BerryConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(BerryConfig::from_toml("[storage\nnamespace = ").is_err());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BerryConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.session.default_user, "guest");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berry.toml");
        std::fs::write(&path, "[session]\ndefault_user = \"carol\"\n").unwrap();
        let cfg = BerryConfig::load(&path).unwrap();
        assert_eq!(cfg.session.default_user, "carol");
    }
}

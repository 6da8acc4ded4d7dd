//! TOML-based engine configuration.
//!
//! Stores:
//! - Energy capacity and regeneration interval
//! - Experience rates and level size
//! - Log level for the CLI subscriber
//! - An optional external catalog path
//!
//! Configuration is stored at `~/.config/progression/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::energy::DEFAULT_REGEN_INTERVAL_MINUTES;
use crate::error::{ConfigError, CoreError};
use crate::experience::DEFAULT_XP_PER_LEVEL;

/// `~/.config/progression[-dev]/` based on PROGRESSION_ENV, without creating it.
fn config_dir() -> PathBuf {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PROGRESSION_ENV").unwrap_or_else(|_| "production".to_string());

    if env == "dev" {
        base_dir.join("progression-dev")
    } else {
        base_dir.join("progression")
    }
}

/// Returns `~/.config/progression[-dev]/` based on PROGRESSION_ENV,
/// creating it if needed.
///
/// Set PROGRESSION_ENV=dev to use the development data directory.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyConfig {
    #[serde(default = "default_energy_max")]
    pub max: u32,
    #[serde(default = "default_regen_interval")]
    pub regen_interval_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceConfig {
    #[serde(default = "default_xp_per_correct")]
    pub xp_per_correct_answer: u64,
    #[serde(default = "default_xp_per_level")]
    pub xp_per_level: u64,
    /// Credit achievement points as XP when an achievement unlocks.
    #[serde(default = "default_true")]
    pub achievement_points_as_xp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub energy: EnergyConfig,
    #[serde(default)]
    pub experience: ExperienceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// External catalog file. The built-in catalog is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

// Default functions
fn default_energy_max() -> u32 {
    100
}
fn default_regen_interval() -> u32 {
    DEFAULT_REGEN_INTERVAL_MINUTES
}
fn default_xp_per_correct() -> u64 {
    10
}
fn default_xp_per_level() -> u64 {
    DEFAULT_XP_PER_LEVEL
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            max: default_energy_max(),
            regen_interval_minutes: default_regen_interval(),
        }
    }
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            xp_per_correct_answer: default_xp_per_correct(),
            xp_per_level: default_xp_per_level(),
            achievement_points_as_xp: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let bad = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let new_value = match obj.get(part) {
                    Some(serde_json::Value::Bool(_)) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| bad(format!("cannot parse '{value}' as bool")))?,
                    ),
                    Some(serde_json::Value::Number(_)) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| bad(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    Some(serde_json::Value::Object(_)) | Some(serde_json::Value::Array(_)) => {
                        serde_json::from_str(value).map_err(|e| bad(e.to_string()))?
                    }
                    Some(_) => serde_json::Value::String(value.into()),
                    // Optional fields are absent from the serialized form.
                    None if part == "catalog_path" => serde_json::Value::String(value.into()),
                    None => return Err(unknown()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path` only if it exists. Never writes.
    pub fn load_from_if_exists(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(path).map(Some)
    }

    /// The saved config, or defaults when there is none. Read-only: unlike
    /// [`Config::load`] this neither creates the directory nor the file.
    pub fn current() -> Self {
        match Self::load_from_if_exists(&config_dir().join("config.toml")) {
            Ok(Some(cfg)) => cfg,
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable configuration");
                Self::default()
            }
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |key: &str, value: u64| {
            if value == 0 {
                Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".into(),
                })
            } else {
                Ok(())
            }
        };
        positive("energy.max", u64::from(self.energy.max))?;
        positive(
            "energy.regen_interval_minutes",
            u64::from(self.energy.regen_interval_minutes),
        )?;
        positive("experience.xp_per_level", self.experience.xp_per_level)?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns an error if the key is
    /// unknown or the resulting config is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// The configured catalog, or the built-in one.
    pub fn catalog(&self) -> Result<Catalog, CoreError> {
        let catalog = match &self.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin()?,
        };
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.energy.max, 100);
        assert_eq!(parsed.energy.regen_interval_minutes, 5);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[energy]\nmax = 60\n").unwrap();
        assert_eq!(parsed.energy.max, 60);
        assert_eq!(parsed.energy.regen_interval_minutes, 5);
        assert_eq!(parsed.experience.xp_per_level, 100);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("energy.max").as_deref(), Some("100"));
        assert_eq!(cfg.get("logging.level").as_deref(), Some("info"));
        assert_eq!(cfg.get("experience.achievement_points_as_xp").as_deref(), Some("true"));
        assert_eq!(cfg.get("energy.nope"), None);
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("energy.max", "150").unwrap();
        cfg.set("experience.achievement_points_as_xp", "false").unwrap();
        cfg.set("logging.level", "debug").unwrap();
        cfg.set("catalog_path", "/tmp/catalog.toml").unwrap();
        assert_eq!(cfg.energy.max, 150);
        assert!(!cfg.experience.achievement_points_as_xp);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.catalog_path, Some(PathBuf::from("/tmp/catalog.toml")));
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(cfg.set("energy.speed", "3").is_err());
        assert!(cfg.set("energy.max", "lots").is_err());
        assert!(cfg.set("energy.max", "0").is_err());
        assert_eq!(cfg.energy.max, 100);
    }

    #[test]
    fn save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.energy.regen_interval_minutes = 3;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.energy.regen_interval_minutes, 3);
    }

    #[test]
    fn load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[experience]\nxp_per_level = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn load_from_if_exists_never_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("config.toml");
        assert_eq!(Config::load_from_if_exists(&path).unwrap(), None);
        assert!(!path.exists());
        assert!(!dir.path().join("missing").exists());

        let present = dir.path().join("config.toml");
        std::fs::write(&present, "[logging]\nlevel = \"debug\"\n").unwrap();
        let cfg = Config::load_from_if_exists(&present).unwrap().unwrap();
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn default_catalog_is_builtin() {
        let catalog = Config::default().catalog().unwrap();
        assert!(catalog.bank("capitals").is_some());
    }
}

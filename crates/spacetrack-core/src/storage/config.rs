//! TOML-based application configuration.
//!
//! Stores:
//! - Engine rules (allowed bulk multipliers, tick interval, load-time repair)
//! - Display preferences for hosts
//! - The space CLI commands act on by default
//!
//! Configuration is stored at `~/.config/spacetrack/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::data_dir;
use crate::error::{ConfigError, Result};

/// Session engine rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bulk-credit multipliers accepted by `record_action`.
    #[serde(default = "default_multipliers")]
    pub allowed_multipliers: Vec<u32>,
    /// Seconds between host ticks while clocked in.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Repair spaces that disagree with their ledger when loaded.
    #[serde(default = "default_true")]
    pub reconcile_on_load: bool,
}

/// Display preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_net_points: bool,
    /// Maximum ledger entries shown by `log list`.
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/spacetrack/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    /// Space used when a command omits `--space`.
    #[serde(default)]
    pub current_space: Option<Uuid>,
}

fn default_multipliers() -> Vec<u32> {
    vec![1, 2, 5, 10]
}
fn default_tick_interval() -> u64 {
    1
}
fn default_true() -> bool {
    true
}
fn default_log_limit() -> usize {
    50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allowed_multipliers: default_multipliers(),
            tick_interval_secs: default_tick_interval(),
            reconcile_on_load: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_net_points: true,
            log_limit: default_log_limit(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            display: DisplayConfig::default(),
            current_space: None,
        }
    }
}

impl EngineConfig {
    pub fn allows_multiplier(&self, multiplier: u32) -> bool {
        self.allowed_multipliers.contains(&multiplier)
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
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Null | serde_json::Value::String(_) if value == "none" => {
                        serde_json::Value::Null
                    }
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds an out-of-range value, or if the default config cannot be
    /// written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
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

    /// Set a config value by key in memory. Callers persist with `save`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit
    /// the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.allowed_multipliers.is_empty()
            || self.engine.allowed_multipliers.contains(&0)
        {
            return Err(ConfigError::InvalidValue {
                key: "engine.allowed_multipliers".to_string(),
                message: "must be a non-empty list of positive integers".to_string(),
            });
        }
        if self.engine.tick_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "engine.tick_interval_secs".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
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
    }

    #[test]
    fn empty_file_uses_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.engine.allowed_multipliers, vec![1, 2, 5, 10]);
        assert!(parsed.engine.reconcile_on_load);
        assert_eq!(parsed.display.log_limit, 50);
        assert!(parsed.current_space.is_none());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("engine.reconcile_on_load").as_deref(), Some("true"));
        assert_eq!(cfg.get("engine.tick_interval_secs").as_deref(), Some("1"));
        assert_eq!(cfg.get("engine.allowed_multipliers").as_deref(), Some("[1,2,5,10]"));
        assert!(cfg.get("engine.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("display.log_limit", "20").unwrap();
        cfg.set("engine.reconcile_on_load", "false").unwrap();
        cfg.set("engine.allowed_multipliers", "[1, 3]").unwrap();
        assert_eq!(cfg.display.log_limit, 20);
        assert!(!cfg.engine.reconcile_on_load);
        assert!(cfg.engine.allows_multiplier(3));
        assert!(!cfg.engine.allows_multiplier(5));
    }

    #[test]
    fn set_current_space_from_null() {
        let mut cfg = Config::default();
        let id = Uuid::new_v4();
        cfg.set("current_space", &id.to_string()).unwrap();
        assert_eq!(cfg.current_space, Some(id));
        cfg.set("current_space", "none").unwrap();
        assert!(cfg.current_space.is_none());
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("engine.nope", "1"),
            Err(crate::error::CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(cfg.set("engine.reconcile_on_load", "maybe").is_err());
        assert!(cfg.set("current_space", "not-a-uuid").is_err());
    }

    #[test]
    fn set_rejects_zero_multiplier() {
        let mut cfg = Config::default();
        assert!(cfg.set("engine.allowed_multipliers", "[0, 2]").is_err());
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.display.show_net_points = false;
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), changed);
    }

    #[test]
    fn load_from_rejects_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[engine]\ntick_interval_secs = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(crate::error::CoreError::Config(ConfigError::InvalidValue { ref key, .. }))
                if key == "engine.tick_interval_secs"
        ));

        std::fs::write(&path, "[engine]\nallowed_multipliers = []\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        std::fs::write(&path, "[engine]\nallowed_multipliers = [0, 5]\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}

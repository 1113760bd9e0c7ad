//! Persistent CLI configuration.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use roster_core::reconcile::{NameComparison, UnselectedFallback};
use roster_core::util::non_blank;
use roster_core::ReconcilePolicy;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR: &str = "roster";

pub const DB_PATH_VAR: &str = "ROSTER_DB_PATH";
pub const NAME_COMPARISON_VAR: &str = "ROSTER_NAME_COMPARISON";
pub const UNSELECTED_FALLBACK_VAR: &str = "ROSTER_UNSELECTED_FALLBACK";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub policy: ReconcilePolicy,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE_NAME)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("roster.db")
}

/// `--db-path`, then the environment, then the config file, then the default
pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
    config: &RosterConfig,
) -> PathBuf {
    cli_db_path
        .or_else(|| optional_trimmed(&lookup, DB_PATH_VAR).map(PathBuf::from))
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(default_db_path)
}

pub fn env_lookup() -> impl Fn(&str) -> Option<String> {
    let values: HashMap<String, String> = env::vars().collect();
    move |name: &str| values.get(name).cloned()
}

pub fn parse_name_comparison(value: &str) -> Result<NameComparison, String> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "exact" => Ok(NameComparison::Exact),
        "ignore_case" => Ok(NameComparison::IgnoreCase),
        other => Err(format!(
            "unknown name comparison '{other}' (expected exact or ignore_case)"
        )),
    }
}

pub fn parse_unselected_fallback(value: &str) -> Result<UnselectedFallback, String> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "apply_all_differing" => Ok(UnselectedFallback::ApplyAllDiffering),
        "keep_stored" => Ok(UnselectedFallback::KeepStored),
        other => Err(format!(
            "unknown unselected fallback '{other}' (expected apply_all_differing or keep_stored)"
        )),
    }
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).as_deref().and_then(non_blank)
}

impl RosterConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Policy overrides from the environment win over the file
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), String> {
        if let Some(value) = optional_trimmed(&lookup, NAME_COMPARISON_VAR) {
            self.policy.name_comparison = parse_name_comparison(&value)?;
        }
        if let Some(value) = optional_trimmed(&lookup, UNSELECTED_FALLBACK_VAR) {
            self.policy.unselected_fallback = parse_unselected_fallback(&value)?;
        }
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key.trim() {
            "db_path" => {
                self.db_path = non_blank(value).map(PathBuf::from);
            }
            "name_comparison" => self.policy.name_comparison = parse_name_comparison(value)?,
            "unselected_fallback" => {
                self.policy.unselected_fallback = parse_unselected_fallback(value)?;
            }
            other => return Err(format!("unknown config key '{other}'")),
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.version = self.version.max(default_config_version());
        self.db_path = self
            .db_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name: &str| values.get(name).cloned()
    }

    #[test]
    fn config_roundtrip_preserves_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = RosterConfig::default();
        config.set("name_comparison", "ignore-case").unwrap();
        config.set("db_path", "/tmp/roster.db").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = RosterConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.policy.name_comparison, NameComparison::IgnoreCase);
        assert_eq!(loaded.db_path, Some(PathBuf::from("/tmp/roster.db")));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RosterConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.policy, ReconcilePolicy::default());
        assert_eq!(config.db_path, None);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"policy":{"unselected_fallback":"keep_stored"}}"#).unwrap();

        let config = RosterConfig::load_from_path(&path).unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(
            config.policy.unselected_fallback,
            UnselectedFallback::KeepStored
        );
        assert_eq!(config.policy.name_comparison, NameComparison::Exact);
    }

    #[test]
    fn set_rejects_unknown_keys_and_values() {
        let mut config = RosterConfig::default();
        assert!(config.set("color", "blue").is_err());
        assert!(config.set("name_comparison", "fuzzy").is_err());
        config.set("db_path", "  ").unwrap();
        assert_eq!(config.db_path, None);
    }

    #[test]
    fn env_overrides_policy() {
        let mut config = RosterConfig::default();
        config
            .apply_env(lookup_from(&[
                (NAME_COMPARISON_VAR, "IGNORE_CASE"),
                (UNSELECTED_FALLBACK_VAR, " keep_stored "),
            ]))
            .unwrap();
        assert_eq!(config.policy.name_comparison, NameComparison::IgnoreCase);
        assert_eq!(
            config.policy.unselected_fallback,
            UnselectedFallback::KeepStored
        );

        assert!(config
            .apply_env(lookup_from(&[(NAME_COMPARISON_VAR, "nope")]))
            .is_err());
    }

    #[test]
    fn db_path_precedence() {
        let config = RosterConfig {
            db_path: Some(PathBuf::from("/from/config.db")),
            ..RosterConfig::default()
        };
        let env = lookup_from(&[(DB_PATH_VAR, "/from/env.db")]);

        assert_eq!(
            resolve_db_path(Some(PathBuf::from("/from/flag.db")), &env, &config),
            PathBuf::from("/from/flag.db")
        );
        assert_eq!(
            resolve_db_path(None, &env, &config),
            PathBuf::from("/from/env.db")
        );
        assert_eq!(
            resolve_db_path(None, lookup_from(&[]), &config),
            PathBuf::from("/from/config.db")
        );
        assert_eq!(
            resolve_db_path(None, lookup_from(&[]), &RosterConfig::default()),
            default_db_path()
        );
    }
}

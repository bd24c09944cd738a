//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The local identity used by the CLI
//! - Calendar conventions (week start, consistency-map window, timezone)
//! - Activity feed size
//!
//! Configuration is stored at `~/.config/habitparty/config.toml`.

use std::path::{Path, PathBuf};

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::clock::SystemClock;
use crate::consistency::{DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::error::ConfigError;
use crate::feed::DEFAULT_FEED_LIMIT;
use crate::model::new_id;

/// First day of the week for weekly views and grid columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }
}

/// Calendar configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_week_start")]
    pub week_starts_on: WeekStart,
    /// Days covered by the consistency map, ending today.
    #[serde(default = "default_grid_window_days")]
    pub grid_window_days: u32,
    /// Fixed offset from UTC in minutes; the machine's local timezone when unset.
    #[serde(default)]
    pub timezone_offset_minutes: Option<i32>,
}

/// Activity feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/habitparty/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identity of the local user; generated on first load.
    #[serde(default = "new_id")]
    pub user_id: String,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

fn default_week_start() -> WeekStart {
    WeekStart::Monday
}
fn default_grid_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}
fn default_feed_limit() -> usize {
    DEFAULT_FEED_LIMIT
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            week_starts_on: default_week_start(),
            grid_window_days: default_grid_window_days(),
            timezone_offset_minutes: None,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            limit: default_feed_limit(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: new_id(),
            calendar: CalendarConfig::default(),
            feed: FeedConfig::default(),
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
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let unknown = || ConfigError::UnknownKey(key.to_string());

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(format!("cannot parse '{value}' as bool: {e}")))?,
                ),
                // Optional numbers serialize as null; "none" clears them again
                serde_json::Value::Number(_) | serde_json::Value::Null => match value {
                    "" | "none" | "null" => serde_json::Value::Null,
                    _ => serde_json::Value::Number(
                        value
                            .parse::<i64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?
                            .into(),
                    ),
                },
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                serde_json::Value::String(_) => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit file, writing defaults if it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let load_failed = |message: String| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message,
                };
                let cfg: Self = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
                cfg.validate().map_err(|e| load_failed(e.to_string()))?;
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
            }),
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
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit its type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Restore every setting to its default, keeping the local identity.
    pub fn reset(&mut self) {
        *self = Self {
            user_id: std::mem::take(&mut self.user_id),
            ..Self::default()
        };
    }

    /// Reject values the engines cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "user_id".into(),
                message: "must not be empty".into(),
            });
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.calendar.grid_window_days) {
            return Err(ConfigError::InvalidValue {
                key: "calendar.grid_window_days".into(),
                message: format!("must be within 1..={MAX_WINDOW_DAYS}"),
            });
        }
        if let Some(minutes) = self.calendar.timezone_offset_minutes {
            if !(-14 * 60..=14 * 60).contains(&minutes) {
                return Err(ConfigError::InvalidValue {
                    key: "calendar.timezone_offset_minutes".into(),
                    message: format!("{minutes} is outside -840..=840"),
                });
            }
        }
        Ok(())
    }

    /// Clock honouring the configured timezone.
    pub fn clock(&self) -> SystemClock {
        SystemClock::from_offset_minutes(self.calendar.timezone_offset_minutes)
    }

    pub fn first_weekday(&self) -> Weekday {
        self.calendar.week_starts_on.weekday()
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
        assert_eq!(parsed.user_id, cfg.user_id);
        assert_eq!(parsed.calendar.week_starts_on, WeekStart::Monday);
        assert_eq!(parsed.calendar.grid_window_days, 364);
        assert_eq!(parsed.feed.limit, 20);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("user_id = \"ana\"\n").unwrap();
        assert_eq!(parsed.user_id, "ana");
        assert_eq!(parsed.calendar.timezone_offset_minutes, None);
        assert_eq!(parsed.first_weekday(), Weekday::Mon);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(
            cfg.get("calendar.week_starts_on").as_deref(),
            Some("monday")
        );
        assert_eq!(cfg.get("feed.limit").as_deref(), Some("20"));
        assert!(cfg.get("calendar.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("calendar.week_starts_on", "sunday").unwrap();
        cfg.set("calendar.grid_window_days", "182").unwrap();
        cfg.set("calendar.timezone_offset_minutes", "-180").unwrap();
        assert_eq!(cfg.first_weekday(), Weekday::Sun);
        assert_eq!(cfg.calendar.grid_window_days, 182);
        assert_eq!(cfg.calendar.timezone_offset_minutes, Some(-180));

        cfg.set("calendar.timezone_offset_minutes", "none").unwrap();
        assert_eq!(cfg.calendar.timezone_offset_minutes, None);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("calendar.nonexistent_key", "value"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("", "value"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_values() {
        let mut cfg = Config::default();
        assert!(cfg.set("feed.limit", "lots").is_err());
        assert!(cfg.set("calendar.week_starts_on", "friday").is_err());
        assert!(cfg.set("calendar.grid_window_days", "0").is_err());
        assert!(cfg.set("calendar.timezone_offset_minutes", "2000").is_err());
        // Failed sets leave the config untouched
        assert_eq!(cfg.calendar.grid_window_days, 364);
        assert_eq!(cfg.feed.limit, 20);
    }

    #[test]
    fn reset_keeps_identity() {
        let mut cfg = Config::default();
        let user_id = cfg.user_id.clone();
        cfg.set("feed.limit", "5").unwrap();
        cfg.set("calendar.week_starts_on", "sunday").unwrap();

        cfg.reset();
        assert_eq!(cfg.user_id, user_id);
        assert_eq!(cfg.feed.limit, 20);
        assert_eq!(cfg.first_weekday(), Weekday::Mon);
    }

    #[test]
    fn load_from_writes_defaults_then_reads_them_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let first = Config::load_from(&path).unwrap();
        assert!(path.exists());
        let second = Config::load_from(&path).unwrap();
        assert_eq!(first.user_id, second.user_id);
    }

    #[test]
    fn load_from_rejects_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        for content in [
            "user_id = \"\"\n",
            "user_id = \"ana\"\n[calendar]\ngrid_window_days = 0\n",
            "user_id = \"ana\"\n[calendar]\ngrid_window_days = 100000\n",
            "user_id = \"ana\"\n[calendar]\ntimezone_offset_minutes = 99999999\n",
        ] {
            std::fs::write(&path, content).unwrap();
            assert!(
                matches!(Config::load_from(&path), Err(ConfigError::LoadFailed { .. })),
                "accepted {content:?}"
            );
        }
    }

    #[test]
    fn set_rejects_window_beyond_cap() {
        let mut cfg = Config::default();
        assert!(cfg.set("calendar.grid_window_days", "3661").is_err());
        cfg.set("calendar.grid_window_days", "3660").unwrap();
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "calendar = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}

//! converge.toml - process-wide settings and named schedules
//!
//! ```toml
//! ignore_schedules = false
//! noop = false
//! cache_file = "~/.local/state/converge/cache.json"
//!
//! [schedules.nightly]
//! period = "daily"
//! range = "01:00 - 05:00"
//! ```

use crate::paths;
use anyhow::{Context, Result};
use declarative::{HarnessSettings, Schedules};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Treat every resource as due regardless of its schedule
    #[serde(default)]
    pub ignore_schedules: bool,

    /// Report changes without applying them
    #[serde(default)]
    pub noop: bool,

    /// Where the value cache is stored; defaults to the state directory
    #[serde(default)]
    pub cache_file: Option<String>,

    #[serde(default)]
    pub schedules: Schedules,
}

impl Config {
    /// Load the config from the config directory
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file()?)
    }

    /// Load the config from `path`, falling back to defaults if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.schedules.validate()?;
        if self.cache_file.as_deref().is_some_and(str::is_empty) {
            anyhow::bail!("cache_file cannot be empty");
        }
        Ok(())
    }

    /// Switches handed to the resource harness
    pub fn settings(&self) -> HarnessSettings {
        HarnessSettings {
            ignore_schedules: self.ignore_schedules,
            noop: self.noop,
        }
    }

    /// Resolved location of the value cache
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_file {
            Some(file) => Ok(paths::expand(file)),
            None => paths::default_cache_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Period, PeriodMatch, PeriodSchedule};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from(&tmp.path().join("converge.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.settings().noop);
    }

    #[test]
    fn test_load_with_schedules() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("converge.toml");
        fs::write(
            &path,
            r#"
noop = true
cache_file = "/var/lib/converge/cache.json"

[schedules.nightly]
period = "daily"
range = "01:00 - 05:00"

[schedules.twice_hourly]
period = "hourly"
repeat = 2
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.settings().noop);
        assert!(!config.settings().ignore_schedules);
        assert_eq!(
            config.cache_path().unwrap(),
            PathBuf::from("/var/lib/converge/cache.json")
        );

        let nightly = config.schedules.get("nightly").unwrap();
        assert_eq!(nightly.period, Some(Period::Daily));
        assert_eq!(nightly.periodmatch, PeriodMatch::Distance);
        assert!(nightly.range.is_some());

        assert_eq!(
            config.schedules.get("twice_hourly"),
            Some(&PeriodSchedule::new(Period::Hourly).with_repeat(2))
        );
    }

    #[test]
    fn test_invalid_schedule_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("converge.toml");
        fs::write(
            &path,
            "[schedules.odd]\nperiod = \"daily\"\nperiodmatch = \"number\"\nrepeat = 3\n",
        )
        .unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("odd"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("converge.toml");
        fs::write(&path, "noop = true\nschedule = \"daily\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_bad_range_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("converge.toml");
        fs::write(&path, "[schedules.broken]\nrange = \"whenever\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_default_cache_path_uses_state_dir() {
        let _guard = crate::paths::tests::env_lock();
        crate::paths::tests::with_env_var(paths::ENV_STATE_DIR, "/tmp/converge-state", || {
            assert_eq!(
                Config::default().cache_path().unwrap(),
                PathBuf::from("/tmp/converge-state/cache.json")
            );
        });
    }
}

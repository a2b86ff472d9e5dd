use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DATA_DIR_ENV: &str = "LORE_DATA_DIR";

/// Optional `config.toml`. Every field has a default, so a missing file is fine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Storage directory; `LORE_DATA_DIR` wins over this.
    pub data_dir: Option<PathBuf>,
    /// Episodes of one pattern in one scope before it is a promotion candidate.
    pub promotion_threshold: usize,
    pub connect_timeout_secs: u64,
    /// Abort `follow` when the stream stays silent this long.
    pub idle_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            promotion_threshold: 3,
            connect_timeout_secs: 10,
            idle_timeout_secs: 120,
        }
    }
}

fn env_base_dir() -> Option<PathBuf> {
    std::env::var(DATA_DIR_ENV).ok().map(PathBuf::from)
}

impl Config {
    /// Load from `explicit` (must exist) or `<base>/config.toml` (may be absent).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let path = env_base_dir()
            .unwrap_or_else(lore_store::default_base_dir)
            .join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Priority: `LORE_DATA_DIR` > `data_dir` > `~/.lore`.
    pub fn base_dir(&self) -> PathBuf {
        env_base_dir()
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(lore_store::default_base_dir)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse("promotion_threshold = 5\nidle_timeout_secs = 30\n").unwrap();
        assert_eq!(config.promotion_threshold, 5);
        assert_eq!(config.idle_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_data_dir() {
        let config = Config::parse("data_dir = \"/srv/lore\"").unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/lore")));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Config::parse("promotion_treshold = 5").is_err());
    }

    #[test]
    fn test_wrong_type_rejected() {
        assert!(Config::parse("promotion_threshold = \"many\"").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lore.toml");
        std::fs::write(&path, "promotion_threshold = 2\n").unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().promotion_threshold, 2);
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("page_size must be between 1 and {max}, got {0}", max = MAX_PAGE_SIZE)]
    PageSize(u32),
}

/// User preferences from `~/.config/ghboard/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub page_size: u32,
    /// Owner to open when none is given on the command line.
    pub owner: Option<String>,
    /// Filter directive for the log file, e.g. `"info"` or `"ghboard=debug"`.
    pub log_level: String,
    pub notification_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            owner: None,
            log_level: "info".to_string(),
            notification_secs: 3,
        }
    }
}

impl Config {
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::PageSize(self.page_size));
        }
        Ok(self)
    }
}

/// `$XDG_CONFIG_HOME/ghboard/config.toml` or the platform equivalent.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ghboard").join("config.toml"))
}

/// Load the config at `path`, or at the default location when `None`.
///
/// A missing file yields the defaults. A file that exists but does not parse
/// is an error so a typo never silently falls back.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_path() {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config: Config =
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.notification_ttl(), Duration::from_secs(3));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "owner = \"acme\"\npage_size = 25\n");
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.owner.as_deref(), Some("acme"));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn page_size_out_of_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "page_size = 500\n");
        assert!(matches!(load(Some(&path)), Err(ConfigError::PageSize(500))));
        let path = write(&dir, "page_size = 0\n");
        assert!(matches!(load(Some(&path)), Err(ConfigError::PageSize(0))));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "owner = [\n");
        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config {
            owner: Some("octocat".into()),
            ..Config::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}

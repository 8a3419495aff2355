//! Configuration management for NetStatWiz
//!
//! Every field has a serde default, so a partial (or absent) config file
//! yields the stock pipeline: `netstat -an` with a 30 second bound, ip-api.com
//! lookups throttled to one per 1.5 seconds, and the two fixed report files.

use crate::error::{NetStatError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Smallest delay between provider requests that stays under 45 requests/minute
pub const MIN_REQUEST_DELAY_MS: u64 = 1500;

/// NetStatWiz configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection-listing command
    #[serde(default)]
    pub source: SourceConfig,
    /// Geolocation provider options
    #[serde(default)]
    pub geolocation: GeolocationConfig,
    /// Report output options
    #[serde(default)]
    pub output: OutputConfig,
}

/// Connection source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Program that lists active connections with numeric addresses
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments passed to `command`
    #[serde(default = "default_command_args")]
    pub args: Vec<String>,
    /// Execution bound in seconds
    #[serde(default = "default_command_timeout")]
    pub timeout_secs: u64,
}

/// Geolocation provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// Provider base URL, without trailing slash
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Delay before every uncached lookup, in milliseconds
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Interactive map file
    #[serde(default = "default_map_file")]
    pub map_file: PathBuf,
    /// Tables report file
    #[serde(default = "default_tables_file")]
    pub tables_file: PathBuf,
    /// Rows shown in each console top list
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_command() -> String {
    "netstat".to_string()
}

fn default_command_args() -> Vec<String> {
    vec!["-an".to_string()]
}

fn default_command_timeout() -> u64 {
    30
}

fn default_endpoint() -> String {
    "http://ip-api.com".to_string()
}

fn default_request_delay() -> u64 {
    MIN_REQUEST_DELAY_MS
}

fn default_request_timeout() -> u64 {
    5
}

fn default_map_file() -> PathBuf {
    PathBuf::from("network_map.html")
}

fn default_tables_file() -> PathBuf {
    PathBuf::from("network_tables.html")
}

fn default_top_n() -> usize {
    10
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_command_args(),
            timeout_secs: default_command_timeout(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_delay_ms: default_request_delay(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            map_file: default_map_file(),
            tables_file: default_tables_file(),
            top_n: default_top_n(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GeolocationConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Get the default configuration directory
    ///
    /// Returns `~/.config/netstatwiz` on Unix-like systems,
    /// or `%APPDATA%\netstatwiz` on Windows.
    pub fn default_path() -> PathBuf {
        let config_dir = if cfg!(windows) {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from(".config"))
        };

        config_dir.join("netstatwiz")
    }

    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_file = Self::default_path().join("config.toml");

        if !config_file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_file)
    }

    /// Validated configuration from the default path, or defaults
    ///
    /// A missing file, unreadable file or invalid value never stops a run.
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&Self::default_path().join("config.toml"))
    }

    /// Validated configuration from `path`, or defaults
    pub fn load_or_default_from(path: &PathBuf) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(path).and_then(|config| config.validate().map(|_| config)) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Ignoring config file {}: {}; using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| NetStatError::Parse(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| NetStatError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values that would break the provider's rate ceiling or the output contract
    pub fn validate(&self) -> Result<()> {
        if self.source.command.trim().is_empty() {
            return Err(NetStatError::Config("source.command must not be empty".into()));
        }
        if self.source.timeout_secs == 0 {
            return Err(NetStatError::Config("source.timeout_secs must be positive".into()));
        }
        if self.geolocation.request_delay_ms < MIN_REQUEST_DELAY_MS {
            return Err(NetStatError::Config(format!(
                "geolocation.request_delay_ms must be at least {} (got {})",
                MIN_REQUEST_DELAY_MS, self.geolocation.request_delay_ms
            )));
        }
        if self.geolocation.timeout_secs == 0 {
            return Err(NetStatError::Config(
                "geolocation.timeout_secs must be positive".into(),
            ));
        }
        if self.output.map_file.as_os_str().is_empty()
            || self.output.tables_file.as_os_str().is_empty()
        {
            return Err(NetStatError::Config("output file paths must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.command, "netstat");
        assert_eq!(config.source.args, vec!["-an".to_string()]);
        assert_eq!(config.source.timeout(), Duration::from_secs(30));
        assert_eq!(config.geolocation.endpoint, "http://ip-api.com");
        assert_eq!(config.geolocation.request_delay(), Duration::from_millis(1500));
        assert_eq!(config.geolocation.timeout(), Duration::from_secs(5));
        assert_eq!(config.output.map_file, PathBuf::from("network_map.html"));
        assert_eq!(config.output.tables_file, PathBuf::from("network_tables.html"));
        assert_eq!(config.output.top_n, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [geolocation]
            request_delay_ms = 2000
            "#,
        )
        .unwrap();
        assert_eq!(config.geolocation.request_delay_ms, 2000);
        assert_eq!(config.geolocation.timeout_secs, 5);
        assert_eq!(config.source.command, "netstat");
        assert_eq!(config.output.top_n, 10);
    }

    #[test]
    fn test_validate_rejects_fast_delay() {
        let mut config = Config::default();
        config.geolocation.request_delay_ms = 500;
        assert!(matches!(config.validate(), Err(NetStatError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.source.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.geolocation.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.output.top_n = 3;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.output.top_n, 3);
        assert_eq!(loaded.source.args, config.source.args);
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.toml");
        assert_eq!(Config::load_or_default_from(&missing).output.top_n, 10);

        let malformed = dir.path().join("malformed.toml");
        std::fs::write(&malformed, "[source\ncommand = ").unwrap();
        let config = Config::load_or_default_from(&malformed);
        assert_eq!(config.source.command, "netstat");

        let too_fast = dir.path().join("too_fast.toml");
        std::fs::write(&too_fast, "[geolocation]\nrequest_delay_ms = 100\n").unwrap();
        let config = Config::load_or_default_from(&too_fast);
        assert_eq!(config.geolocation.request_delay_ms, MIN_REQUEST_DELAY_MS);
    }

    #[test]
    fn test_load_or_default_keeps_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\ntop_n = 4\n").unwrap();
        assert_eq!(Config::load_or_default_from(&path).output.top_n, 4);
    }

    #[test]
    fn test_default_path_ends_with_crate_dir() {
        assert!(Config::default_path().ends_with("netstatwiz"));
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[source\ncommand = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(NetStatError::Parse(_))));
    }
}

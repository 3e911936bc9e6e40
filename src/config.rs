use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{env, path::Path, path::PathBuf};
use tracing::{debug, warn};
use url::Url;

use crate::api::DEFAULT_COUNTRY_CODE;
use crate::settings::{mask_key, DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_BRANCH_LOCATION};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Prefix applied to local phone numbers
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_branch_location")]
    pub branch_location: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}
fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}
fn default_branch_location() -> String {
    DEFAULT_BRANCH_LOCATION.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            country_code: default_country_code(),
            branch_location: default_branch_location(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per call, the first one included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}
const fn default_initial_delay_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

/// Per-attempt timeouts, independent of retry delays
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    #[serde(default = "default_timeout")]
    pub connect_seconds: u64,
    #[serde(default = "default_timeout")]
    pub read_seconds: u64,
    #[serde(default = "default_timeout")]
    pub write_seconds: u64,
}

const fn default_timeout() -> u64 {
    30
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: default_timeout(),
            read_seconds: default_timeout(),
            write_seconds: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

const ENV_VARS: [&str; 10] = [
    "KIOSKLINK_BASE_URL",
    "KIOSKLINK_API_KEY",
    "KIOSKLINK_COUNTRY_CODE",
    "KIOSKLINK_MAX_RETRIES",
    "KIOSKLINK_INITIAL_DELAY_MS",
    "KIOSKLINK_CONNECT_TIMEOUT",
    "KIOSKLINK_READ_TIMEOUT",
    "KIOSKLINK_WRITE_TIMEOUT",
    "KIOSKLINK_LOG_LEVEL",
    "KIOSKLINK_LOG_FORMAT",
];

impl Config {
    /// Names of every environment variable [`Config::from_env`] reads
    #[must_use]
    pub const fn env_vars() -> &'static [&'static str] {
        &ENV_VARS
    }

    /// Load configuration from a TOML file at the specified path
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The file cannot be read
    /// - The TOML content cannot be parsed into the Config structure
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Defaults overridden by any `KIOSKLINK_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(base_url) = env::var("KIOSKLINK_BASE_URL") {
            self.api.base_url = base_url;
        }
        if let Ok(api_key) = env::var("KIOSKLINK_API_KEY") {
            self.api.api_key = api_key;
        }
        if let Ok(country_code) = env::var("KIOSKLINK_COUNTRY_CODE") {
            self.api.country_code = country_code;
        }

        if let Ok(max_retries) = env::var("KIOSKLINK_MAX_RETRIES") {
            self.retry.max_retries = max_retries.parse()?;
        }
        if let Ok(delay) = env::var("KIOSKLINK_INITIAL_DELAY_MS") {
            self.retry.initial_delay_ms = delay.parse()?;
        }

        if let Ok(connect) = env::var("KIOSKLINK_CONNECT_TIMEOUT") {
            self.timeouts.connect_seconds = connect.parse()?;
        }
        if let Ok(read) = env::var("KIOSKLINK_READ_TIMEOUT") {
            self.timeouts.read_seconds = read.parse()?;
        }
        if let Ok(write) = env::var("KIOSKLINK_WRITE_TIMEOUT") {
            self.timeouts.write_seconds = write.parse()?;
        }

        if let Ok(level) = env::var("KIOSKLINK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("KIOSKLINK_LOG_FORMAT") {
            self.logging.format = format;
        }
        Ok(())
    }

    /// Candidate config file locations, most specific first
    #[must_use]
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("kiosklink.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("kiosklink").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/kiosklink/config.toml"));
        paths
    }

    /// Load configuration from default locations and environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - An environment variable holds an invalid value
    /// - Configuration validation fails
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_paths())
    }

    /// Load the first readable file among `paths`, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is invalid or validation fails
    pub fn load_from(paths: &[PathBuf]) -> Result<Self> {
        let mut config = None;
        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(file_config) => {
                    debug!(path = %path.display(), "Loaded config file");
                    config = Some(file_config);
                    break;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            debug!("No config file found, using defaults");
            Self::default()
        });

        // Environment values take precedence over file values
        config.apply_env()?;
        config.validate()?;
        debug!(
            base_url = %config.api.base_url,
            api_key = %mask_key(&config.api.api_key),
            max_retries = config.retry.max_retries,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Merge another configuration into this one; values in `other` that
    /// differ from the defaults take precedence
    pub fn merge(&mut self, other: Self) {
        let defaults = Self::default();

        if other.api.base_url != defaults.api.base_url {
            self.api.base_url = other.api.base_url;
        }
        if other.api.api_key != defaults.api.api_key {
            self.api.api_key = other.api.api_key;
        }
        if other.api.country_code != defaults.api.country_code {
            self.api.country_code = other.api.country_code;
        }
        if other.api.branch_location != defaults.api.branch_location {
            self.api.branch_location = other.api.branch_location;
        }

        if other.retry.max_retries != defaults.retry.max_retries {
            self.retry.max_retries = other.retry.max_retries;
        }
        if other.retry.initial_delay_ms != defaults.retry.initial_delay_ms {
            self.retry.initial_delay_ms = other.retry.initial_delay_ms;
        }

        if other.timeouts.connect_seconds != defaults.timeouts.connect_seconds {
            self.timeouts.connect_seconds = other.timeouts.connect_seconds;
        }
        if other.timeouts.read_seconds != defaults.timeouts.read_seconds {
            self.timeouts.read_seconds = other.timeouts.read_seconds;
        }
        if other.timeouts.write_seconds != defaults.timeouts.write_seconds {
            self.timeouts.write_seconds = other.timeouts.write_seconds;
        }

        if other.logging.level != defaults.logging.level {
            self.logging.level = other.logging.level;
        }
        if other.logging.format != defaults.logging.format {
            self.logging.format = other.logging.format;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The base URL is not an absolute http(s) URL
    /// - The retry budget or a timeout is zero
    /// - The log format is unknown
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.api.base_url)
            .map_err(|e| anyhow!("invalid base_url {:?}: {e}", self.api.base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!("base_url must use http or https"));
        }

        if self.retry.max_retries == 0 {
            return Err(anyhow!("max_retries must be greater than 0"));
        }

        if self.timeouts.connect_seconds == 0
            || self.timeouts.read_seconds == 0
            || self.timeouts.write_seconds == 0
        {
            return Err(anyhow!("timeouts must be greater than 0"));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(anyhow!(
                "log format must be \"text\" or \"json\", got {:?}",
                self.logging.format
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://bot.tripandevent.com/api/");
        assert_eq!(config.api.api_key, DEFAULT_API_KEY);
        assert_eq!(config.api.country_code, "+971");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(
            config.timeouts,
            TimeoutConfig {
                connect_seconds: 30,
                read_seconds: 30,
                write_seconds: 30,
            }
        );
        assert_eq!(config.logging.format, "text");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.api.base_url = "bot.tripandevent.com/api".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "ftp://bot.tripandevent.com/".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "http://localhost:8080/api/".to_string();
        assert!(config.validate().is_ok());

        config.retry.max_retries = 0;
        assert!(config.validate().is_err());
        config.retry.max_retries = 1;

        config.timeouts.read_seconds = 0;
        assert!(config.validate().is_err());
        config.timeouts.read_seconds = 5;

        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.api.api_key = "base-key".to_string();
        base.retry.initial_delay_ms = 250;

        let other = Config {
            api: ApiConfig {
                base_url: "https://staging.example.com/api/".to_string(),
                ..ApiConfig::default()
            },
            retry: RetryConfig {
                max_retries: 5,
                ..RetryConfig::default()
            },
            ..Default::default()
        };

        base.merge(other);

        assert_eq!(base.api.base_url, "https://staging.example.com/api/");
        assert_eq!(base.api.api_key, "base-key");
        assert_eq!(base.retry.max_retries, 5);
        assert_eq!(base.retry.initial_delay_ms, 250);
    }

    #[test]
    fn test_load_from_first_existing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("kiosklink.toml");
        fs::write(
            &present,
            r#"
            [api]
            base_url = "https://file.example.com/api/"

            [retry]
            max_retries = 4
            "#,
        )
        .unwrap();

        let config = Config::load_from(&[missing, present]).unwrap();
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        // Environment overrides may apply to base_url in CI, so only check
        // it when the variable is absent
        if env::var("KIOSKLINK_BASE_URL").is_err() {
            assert_eq!(config.api.base_url, "https://file.example.com/api/");
        }
    }

    #[test]
    fn test_load_skips_unparsable_file() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[retry\nmax_retries = ").unwrap();
        let config = Config::load_from(&[broken]).unwrap();
        if env::var("KIOSKLINK_MAX_RETRIES").is_err() {
            assert_eq!(config.retry.max_retries, 3);
        }
    }
}

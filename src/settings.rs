use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ApiConfig;

pub const DEFAULT_BASE_URL: &str = "https://bot.tripandevent.com/api/";
pub const DEFAULT_API_KEY: &str = "test_sanbot_key_abc123xyz789";
pub const DEFAULT_BRANCH_LOCATION: &str = "Dubai Office";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Show only the last four characters of a credential
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Runtime endpoint and credential shared by every request.
///
/// Both values can be replaced while requests are in flight; each request
/// reads whatever is current when its pipeline stage runs. Blank values fall
/// back to the compiled-in defaults.
#[derive(Debug)]
pub struct PipelineConfig {
    base_url: RwLock<String>,
    api_key: RwLock<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: RwLock::new(DEFAULT_BASE_URL.to_string()),
            api_key: RwLock::new(DEFAULT_API_KEY.to_string()),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: RwLock::new(or_default(base_url, DEFAULT_BASE_URL)),
            api_key: RwLock::new(or_default(api_key, DEFAULT_API_KEY)),
        }
    }

    #[must_use]
    pub fn from_api_config(api: &ApiConfig) -> Self {
        Self::new(&api.base_url, &api.api_key)
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn api_key(&self) -> String {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_base_url(&self, base_url: &str) {
        let next = or_default(base_url, DEFAULT_BASE_URL);
        let mut current = self
            .base_url
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if *current != next {
            info!(base_url = %next, "API base URL updated");
            *current = next;
        }
    }

    pub fn set_api_key(&self, api_key: &str) {
        let next = or_default(api_key, DEFAULT_API_KEY);
        let mut current = self.api_key.write().unwrap_or_else(PoisonError::into_inner);
        if *current != next {
            info!(api_key = %mask_key(&next), "API key updated");
            *current = next;
        }
    }

    /// Apply a settings snapshot
    pub fn apply(&self, settings: &Settings) {
        self.set_base_url(&settings.api_base_url);
        self.set_api_key(&settings.api_key);
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Values an operator can change on the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_branch_location")]
    pub branch_location: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}
fn default_branch_location() -> String {
    DEFAULT_BRANCH_LOCATION.to_string()
}
fn default_admin_password() -> String {
    DEFAULT_ADMIN_PASSWORD.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_base_url(),
            api_key: default_api_key(),
            branch_location: default_branch_location(),
            admin_password: default_admin_password(),
        }
    }
}

/// TOML-file backed settings with change notification.
///
/// Every successful update is persisted first and then published to
/// subscribers.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    sender: watch::Sender<Settings>,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    /// Open the store at `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let settings = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            toml::from_str(&contents)?
        } else {
            debug!(path = %path.display(), "No settings file, using defaults");
            Settings::default()
        };
        let (sender, _) = watch::channel(settings);
        Ok(Self {
            path,
            sender,
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn snapshot(&self) -> Settings {
        Settings::clone(&self.sender.borrow())
    }

    /// Receive every snapshot published after this call
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.sender.subscribe()
    }

    fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.snapshot();
        change(&mut next);
        self.persist(&next)?;
        self.sender.send_replace(next);
        Ok(())
    }

    fn persist(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, toml::to_string_pretty(settings)?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the settings file cannot be written
    pub fn update_api_base_url(&self, url: &str) -> Result<(), SettingsError> {
        self.update(|settings| settings.api_base_url = url.to_string())
    }

    /// # Errors
    ///
    /// Returns an error if the settings file cannot be written
    pub fn update_api_key(&self, key: &str) -> Result<(), SettingsError> {
        self.update(|settings| settings.api_key = key.to_string())
    }

    /// # Errors
    ///
    /// Returns an error if the settings file cannot be written
    pub fn update_branch_location(&self, location: &str) -> Result<(), SettingsError> {
        self.update(|settings| settings.branch_location = location.to_string())
    }

    /// # Errors
    ///
    /// Returns an error if the settings file cannot be written
    pub fn update_admin_password(&self, password: &str) -> Result<(), SettingsError> {
        self.update(|settings| settings.admin_password = password.to_string())
    }

    /// Remove the settings file and publish defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and cannot be removed
    pub fn clear_all(&self) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.sender.send_replace(Settings::default());
        Ok(())
    }

    /// Keep `config` in sync with this store.
    ///
    /// The current snapshot is applied immediately; later updates are applied
    /// by a background task that ends when the store is dropped.
    #[must_use]
    pub fn bind(&self, config: Arc<PipelineConfig>) -> JoinHandle<()> {
        let mut receiver = self.subscribe();
        config.apply(&receiver.borrow_and_update());
        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let settings = Settings::clone(&receiver.borrow_and_update());
                config.apply(&settings);
            }
            debug!("Settings store closed, stopping pipeline config sync");
        })
    }
}

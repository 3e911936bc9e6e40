use anyhow::{anyhow, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use std::path::PathBuf;

use crate::api::ApiClient;
use crate::config::Config;

pub struct InitOptions {
    pub config_path: Option<PathBuf>,
    pub no_prompt: bool,
    pub force: bool,
}

/// Where `init` writes when no path is given
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kiosklink")
        .join("config.toml")
}

async fn check_backend(config: &Config) -> Result<()> {
    let client = ApiClient::from_config(config)?;
    let health = client
        .health_check()
        .await
        .map_err(|e| anyhow!("{e} {}", e.recovery_suggestion()))?;
    println!("Backend status: {} (version {})", health.status, health.version);
    Ok(())
}

/// Write a starter config file.
///
/// Without prompting, the file holds the defaults overridden by any
/// `KIOSKLINK_*` environment variables.
///
/// # Errors
///
/// Returns an error if the file exists and `force` is not set, a prompt
/// fails, the entered values do not validate, or the file cannot be written
pub async fn initialize_config(opts: InitOptions) -> Result<PathBuf> {
    let config_path = opts.config_path.unwrap_or_else(default_config_path);

    if config_path.exists() && !opts.force {
        return Err(anyhow!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        ));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut config = Config::from_env()?;

    if !opts.no_prompt {
        println!("Initializing kiosklink configuration...\n");
        let theme = ColorfulTheme::default();

        config.api.base_url = Input::with_theme(&theme)
            .with_prompt("Backend base URL")
            .with_initial_text(config.api.base_url.clone())
            .interact_text()?;

        config.api.api_key = Input::with_theme(&theme)
            .with_prompt("API key")
            .with_initial_text(config.api.api_key.clone())
            .interact_text()?;

        config.api.country_code = Input::with_theme(&theme)
            .with_prompt("Default country code for local phone numbers")
            .with_initial_text(config.api.country_code.clone())
            .interact_text()?;

        config.api.branch_location = Input::with_theme(&theme)
            .with_prompt("Branch location")
            .with_initial_text(config.api.branch_location.clone())
            .interact_text()?;

        config.validate()?;

        let test_connection = Confirm::with_theme(&theme)
            .with_prompt("Test the connection now?")
            .default(true)
            .interact()?;
        if test_connection {
            print!("Checking backend health... ");
            match check_backend(&config).await {
                Ok(()) => println!("✓ Success"),
                Err(e) => {
                    println!("✗ Failed");
                    return Err(anyhow!("Backend check failed: {e}"));
                }
            }
        }
    }

    config.validate()?;
    let toml = toml::to_string_pretty(&config)?;
    std::fs::write(&config_path, toml)?;

    println!("\nConfiguration created at: {}", config_path.display());
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_no_prompt_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let written = initialize_config(InitOptions {
            config_path: Some(path.clone()),
            no_prompt: true,
            force: false,
        })
        .await
        .unwrap();

        assert_eq!(written, path);
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.api.country_code, "+971");
    }

    #[tokio::test]
    async fn test_existing_file_needs_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# existing").unwrap();

        let err = initialize_config(InitOptions {
            config_path: Some(path.clone()),
            no_prompt: true,
            force: false,
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# existing");
    }
}

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

use kiosklink::api::{ApiClient, CallError, CreateLeadRequest, PackageQuery};
use kiosklink::cli::{Cli, Commands};
use kiosklink::config::Config;
use kiosklink::{initialize_config, InitOptions};

type Filtered = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type FormatLayer = Box<dyn Layer<Filtered> + Send + Sync>;

/// Reload handles for a subscriber installed before the config file was read
struct Logging {
    filter: reload::Handle<EnvFilter, Registry>,
    format: reload::Handle<FormatLayer, Filtered>,
}

impl Logging {
    /// Switch to the config file's level and format where no flag overrides them
    fn apply(&self, cli: &Cli, config: &Config) {
        if cli.log_level.is_none() && !cli.verbose {
            let filter = EnvFilter::new(&config.logging.level);
            if let Err(e) = self.filter.reload(filter) {
                warn!(error = %e, "Could not apply configured log level");
            }
        }
        if cli.log_format.is_none() {
            if let Err(e) = self.format.reload(format_layer(&config.logging.format)) {
                warn!(error = %e, "Could not apply configured log format");
            }
        }
    }
}

fn format_layer(format: &str) -> FormatLayer {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);
    if format == "json" {
        Box::new(layer.json())
    } else {
        Box::new(layer)
    }
}

fn init_logging(cli: &Cli) -> Option<Logging> {
    // RUST_LOG means someone else is in charge of the subscriber
    if std::env::var("RUST_LOG").is_ok() {
        return None;
    }
    let level = cli.log_level.as_deref().unwrap_or("info");
    let filter = if cli.verbose { "debug" } else { level };
    let format = cli.log_format.as_deref().unwrap_or("text");

    let (filter, filter_handle) = reload::Layer::new(EnvFilter::new(filter));
    let (format, format_handle) = reload::Layer::new(format_layer(format));
    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init()
        .ok()?;

    Some(Logging {
        filter: filter_handle,
        format: format_handle,
    })
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) if !path.exists() => bail!("Config file not found: {}", path.display()),
        Some(path) => Config::load_from(std::slice::from_ref(path)),
        None => Config::load(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the body, or the error with its recovery hint
fn report<T: Serialize>(result: Result<T, CallError>) -> Result<()> {
    match result {
        Ok(body) => print_json(&body),
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{}", e.recovery_suggestion());
            bail!("{} failed", e.code())
        }
    }
}

async fn run(command: Commands, client: &ApiClient, config: &Config) -> Result<()> {
    match command {
        Commands::Health => report(client.health_check().await),
        Commands::Packages {
            category,
            min_price,
            max_price,
            limit,
        } => {
            let query = PackageQuery {
                category,
                min_price,
                max_price,
                limit: Some(limit),
            };
            report(client.get_packages(&query).await)
        }
        Commands::Package { id } => report(client.get_package_detail(&id).await),
        Commands::Media {
            media_type,
            category,
        } => report(
            client
                .get_media(media_type.as_deref(), category.as_deref())
                .await,
        ),
        Commands::RemoteConfig => report(client.get_config().await),
        Commands::Lead {
            name,
            phone,
            email,
            location,
        } => {
            let location = location.unwrap_or_else(|| config.api.branch_location.clone());
            let mut request = CreateLeadRequest::new(name, client.format_phone(&phone), location);
            request.email = email;
            report(client.create_lead(&request).await)
        }
        Commands::Init { .. } => bail!("init is handled before the client is built"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let logging = init_logging(&cli);

    // Handle init command early as it doesn't need config loading
    if let Commands::Init { no_prompt, force } = cli.command {
        return initialize_config(InitOptions {
            config_path: cli.config,
            no_prompt,
            force,
        })
        .await
        .map(|_| ());
    }

    let config = load_config(cli.config.as_ref())?;
    if let Some(logging) = &logging {
        logging.apply(&cli, &config);
    }
    debug!(base_url = %config.api.base_url, "Using backend");

    let client = ApiClient::from_config(&config)?;
    let result = tokio::select! {
        result = run(cli.command, &client, &config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, cancelling request");
            client.shutdown();
            bail!("Interrupted");
        }
    };

    let quota = client.rate_limit().snapshot();
    debug!(
        limit = quota.limit,
        remaining = quota.remaining,
        reset_at_epoch_ms = quota.reset_at_epoch_ms,
        "Rate limit after call"
    );
    result
}

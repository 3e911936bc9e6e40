use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (defaults to the standard search paths)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Set log level, overriding the config file
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Set log format (text or json), overriding the config file
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration file at `--config` or the user config dir
    Init {
        /// Don't prompt for input, use defaults
        #[arg(long)]
        no_prompt: bool,

        /// Force overwrite if config file exists
        #[arg(long)]
        force: bool,
    },

    /// Check that the backend is reachable
    Health,

    /// List tour packages
    Packages {
        /// Only packages in this category
        #[arg(long)]
        category: Option<String>,

        /// Minimum price
        #[arg(long)]
        min_price: Option<u32>,

        /// Maximum price
        #[arg(long)]
        max_price: Option<u32>,

        /// Maximum number of packages to return
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show one tour package
    Package {
        /// Package id
        id: String,
    },

    /// List promotional media
    Media {
        /// Media type, e.g. video or image
        #[arg(long = "type")]
        media_type: Option<String>,

        /// Only media in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Fetch the remote kiosk configuration
    RemoteConfig,

    /// Register a customer lead
    Lead {
        /// Customer name
        #[arg(long)]
        name: String,

        /// Phone number; local numbers get the configured country code
        #[arg(long)]
        phone: String,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Branch the lead was captured at (defaults to the configured branch)
        #[arg(long)]
        location: Option<String>,
    },
}

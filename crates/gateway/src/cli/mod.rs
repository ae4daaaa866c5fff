pub mod config;
pub mod doctor;

use clap::{Parser, Subcommand};
use mux_domain::config::Config;

/// mcplexer — a multiplexing gateway between agent clients and the tool
/// servers they call through.
#[derive(Debug, Parser)]
#[command(name = "mcplexer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any issues.
    Validate,
    /// Dump the resolved configuration, with defaults filled in, as TOML.
    Show,
}

/// Load the configuration from the path named by `MUX_CONFIG` (default
/// `config.toml`), falling back to `Config::default()` when the file is
/// absent so a dev box with nothing on disk still boots.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("MUX_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

mod admin;
mod cli;
mod server;
mod state;

use clap::Parser;
use mux_domain::config::{Config, ConfigSeverity};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ConfigCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            let (config, _config_path) = cli::load_config()?;
            init_tracing(&config);
            run_server(config).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = cli::load_config()?;
            let passed = cli::doctor::run(&config, &config_path);
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config()?;
            let ok = cli::config::validate(&config, &config_path);
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config()?;
            cli::config::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("mcplexer {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = config
        .observability
        .filter
        .clone()
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info,mux_gateway=debug"));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.observability.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!(service = %config.observability.service_name, "mcplexer starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if Config::has_errors(&issues) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let state = AppState::bootstrap(config).await?;

    if state.config.admin.enabled {
        let admin_state = state.clone();
        let addr = format!("{}:{}", state.config.admin.host, state.config.admin.port);
        tokio::spawn(async move {
            let app = admin::router().with_state(admin_state);
            match tokio::net::TcpListener::bind(&addr).await {
                Ok(listener) => {
                    tracing::info!(%addr, "admin API listening");
                    if let Err(e) = axum::serve(listener, app).await {
                        tracing::error!(error = %e, "admin API server exited");
                    }
                }
                Err(e) => tracing::error!(error = %e, %addr, "failed to bind admin API"),
            }
        });
    } else {
        tracing::info!("admin API disabled");
    }

    let result = server::serve(state.clone()).await;
    state.shutdown().await;
    result
}

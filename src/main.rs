//! CreditChat - credit-metered AI chat CLI and server
//!
//! Main entry point for the CreditChat application.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use creditchat::cli::{Cli, Commands, CreditCommand, ImageCommand, UserCommand};
use creditchat::commands;
use creditchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so --verbose and --json-logs shape the subscriber
    let cli = Cli::parse_args();
    init_tracing(cli.verbose, cli.json_logs);

    if let Some(db_path) = &cli.storage_path {
        tracing::info!("Using storage DB override from CLI: {}", db_path);
    }

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting API server");
            commands::serve::run_serve(config).await?;
        }
        Commands::Users { command } => match command {
            UserCommand::Add { name, credits } => {
                let storage = commands::open_storage(&config)?;
                commands::accounts::add_user(&storage, &name, credits)?;
            }
        },
        Commands::Credits { command } => match command {
            CreditCommand::Grant { user, amount } => {
                let storage = commands::open_storage(&config)?;
                commands::accounts::grant_credits(&storage, &user, amount)?;
            }
        },
        Commands::Images { command } => {
            let storage = commands::open_storage(&config)?;
            match command {
                ImageCommand::Publish { chat, index } => {
                    commands::images::set_published(&storage, &chat, index, true)?;
                }
                ImageCommand::Unpublish { chat, index } => {
                    commands::images::set_published(&storage, &chat, index, false)?;
                }
            }
        }
        Commands::Login { token } => {
            commands::login::login(&config, &token).await?;
        }
        Commands::Logout => {
            commands::login::logout()?;
        }
        Commands::Chat { .. } => {
            tracing::info!("Starting interactive chat client");
            commands::chat::run_chat(config).await?;
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "creditchat=debug"
    } else {
        "creditchat=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

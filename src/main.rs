use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::net::TcpListener;

use relay_chat::config::{self, AppConfig};
use relay_chat::server::{self, AppState};

#[derive(Parser)]
#[command(
    name = "relay_chat",
    version,
    about = "Long-polling chat relay with SQLite history"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, PartialEq, Eq)]
enum Mode {
    /// Run the relay server
    Serve {
        /// Listen address, overrides `bind` from the config file
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
        /// SQLite file for chat history
        #[arg(long, value_name = "PATH")]
        database: Option<String>,
        /// Write the effective settings back to the config file first
        #[arg(long)]
        write_config: bool,
    },
    /// Join the chat from this terminal (default)
    Client {
        /// Relay url, overrides `server_url` from the config file
        #[arg(long, value_name = "URL")]
        server: Option<String>,
        /// Chat alias; prompted for when omitted
        #[arg(long)]
        name: Option<String>,
        /// On joining, show only your own past messages
        #[arg(long)]
        mine: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);

    match cli.mode.unwrap_or(Mode::Client {
        server: None,
        name: None,
        mine: false,
    }) {
        Mode::Serve {
            bind,
            database,
            write_config,
        } => {
            if let Some(bind) = bind {
                app_config.bind = bind;
            }
            if let Some(database) = database {
                app_config.database_path = database;
            }
            if write_config {
                config::save_config(&cli.config, &app_config)?;
                log::info!("Wrote settings to {}", cli.config);
            }
            run_server(&app_config).await?;
        }
        Mode::Client { server, name, mine } => {
            let server_url = server.unwrap_or_else(|| app_config.server_url.clone());
            relay_chat::client::console::run(&app_config, &server_url, name, mine).await?;
        }
    }
    Ok(())
}

async fn run_server(app_config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_config(app_config)?);
    let listener = TcpListener::bind(&app_config.bind).await?;

    tokio::select! {
        served = server::serve(listener, state) => served?,
        _ = tokio::signal::ctrl_c() => log::info!("Shutting down chat relay"),
    }
    Ok(())
}

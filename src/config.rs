use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::ensure_parent_dir;

pub const DEFAULT_CONFIG_PATH: &str = "config/relay.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the relay server listens on.
    pub bind: String,
    pub database_path: String,
    /// Optional file of blocked words, one per line.
    pub word_filter_path: Option<String>,
    /// How long a long-poll request is held before answering 204.
    /// Zero holds it until a message arrives or the client goes away.
    pub long_poll_timeout_secs: u64,
    /// Relay the console client talks to.
    pub server_url: String,
    /// Client-side alias to color mapping.
    pub color_book_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            database_path: "data/chat.db".to_string(),
            word_filter_path: None,
            long_poll_timeout_secs: 0,
            server_url: "http://127.0.0.1:5000".to_string(),
            color_book_path: "data/user_colors.json".to_string(),
        }
    }
}

impl AppConfig {
    pub fn long_poll_timeout(&self) -> Option<Duration> {
        (self.long_poll_timeout_secs > 0).then(|| Duration::from_secs(self.long_poll_timeout_secs))
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}

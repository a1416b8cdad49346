//! Relay HTTP server.
//!
//! # Endpoints
//!
//! - `GET /messages?id=<client>` - long-poll for the next message
//! - `POST /messages` - publish a message
//! - `POST /users` - sign in with a name and color
//! - `DELETE /users/:name` - sign out
//! - `GET /history` - stored messages (`sender`, `from`, `to`, `hours`)
//! - `DELETE /history/:sender` - forget one sender's messages
//! - `GET /stats` - message counts
//! - `GET /health` - liveness

pub mod handlers;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::filter::WordFilter;
use crate::relay::{Broadcaster, UserDirectory};
use crate::storage::{HistoryStore, SqliteHistory, StoreResult};

/// Shared application state
pub struct AppState {
    pub broadcaster: Broadcaster,
    pub users: UserDirectory,
    pub filter: WordFilter,
    pub long_poll_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self {
            broadcaster: Broadcaster::new(history),
            users: UserDirectory::new(),
            filter: WordFilter::default(),
            long_poll_timeout: None,
        }
    }

    pub fn with_filter(mut self, filter: WordFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_long_poll_timeout(mut self, limit: Option<Duration>) -> Self {
        self.long_poll_timeout = limit;
        self
    }

    /// Build the state described by `config`: SQLite history at
    /// `database_path`, optional word filter, long-poll limit.
    pub fn from_config(config: &AppConfig) -> StoreResult<Self> {
        let history = SqliteHistory::open(&config.database_path)?;
        let filter = config
            .word_filter_path
            .as_deref()
            .map(WordFilter::load)
            .unwrap_or_default();
        if filter.is_empty() {
            log::info!("No blocked words configured; messages pass unfiltered");
        }

        Ok(Self::new(Arc::new(history))
            .with_filter(filter)
            .with_long_poll_timeout(config.long_poll_timeout()))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    routes::api_routes().with_state(state)
}

/// Serve the relay on `listener`. Runs until the listener fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("Chat relay listening on http://{addr}");
    }
    axum::serve(listener, build_router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn from_config_wires_history_filter_and_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let words = dir.path().join("words.txt");
        fs::write(&words, "darn\n").unwrap();

        let config = AppConfig {
            database_path: dir.path().join("db").join("chat.db").display().to_string(),
            word_filter_path: Some(words.display().to_string()),
            long_poll_timeout_secs: 15,
            ..AppConfig::default()
        };

        let state = AppState::from_config(&config).unwrap();
        assert!(!state.filter.is_empty());
        assert_eq!(state.filter.censor("darn"), "****");
        assert_eq!(state.long_poll_timeout, Some(Duration::from_secs(15)));
        assert!(dir.path().join("db").join("chat.db").exists());
    }

    #[test]
    fn from_config_without_word_list_leaves_content_alone() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: dir.path().join("chat.db").display().to_string(),
            ..AppConfig::default()
        };

        let state = AppState::from_config(&config).unwrap();
        assert!(state.filter.is_empty());
        assert_eq!(state.long_poll_timeout, None);
    }
}

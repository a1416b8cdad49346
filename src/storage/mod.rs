pub mod database;
pub mod history;
pub mod models;

pub use database::Database;
pub use history::{HistoryStore, SqliteHistory};
pub use models::{ChatStats, HistoryQuery, SenderCount};

use std::fs;
use std::path::Path;

/// Errors raised by the chat history store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored row has invalid {field}: {value}")]
    CorruptRow { field: &'static str, value: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ensure the directory that will hold `path` exists.
pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

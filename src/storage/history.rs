use chrono::{DateTime, Utc};
use rusqlite::{Connection, ToSql, params};
use std::path::Path;

use super::database::Database;
use super::models::{ChatStats, HistoryQuery, SenderCount};
use super::{StoreError, StoreResult};
use crate::common::{ChatMessage, DisplayColor};

/// Where published messages are recorded.
///
/// The relay only needs `append`; the read side backs the history and
/// statistics endpoints.
pub trait HistoryStore: Send + Sync {
    /// Record one message.
    fn append(&self, message: &ChatMessage) -> StoreResult<()>;

    /// Messages matching `query`, oldest first.
    fn query(&self, query: &HistoryQuery) -> StoreResult<Vec<ChatMessage>>;

    /// Delete every message sent by `sender`; returns how many were removed.
    fn delete_sender(&self, sender: &str) -> StoreResult<usize>;

    fn stats(&self) -> StoreResult<ChatStats>;
}

/// SQLite-backed chat history.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     sender TEXT NOT NULL UNIQUE,
///     sender_color TEXT NOT NULL
/// );
/// CREATE TABLE messages (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     content TEXT NOT NULL,
///     timestamp INTEGER NOT NULL,      -- unix millis
///     sender_id INTEGER NOT NULL REFERENCES users(id)
/// );
/// ```
pub struct SqliteHistory {
    db: Database,
}

impl SqliteHistory {
    /// Open (or create) the history database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let history = Self {
            db: Database::open(path)?,
        };
        history.init_schema()?;
        Ok(history)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let history = Self {
            db: Database::in_memory()?,
        };
        history.init_schema()?;
        Ok(history)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    sender TEXT NOT NULL UNIQUE,
                    sender_color TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    content TEXT NOT NULL,
                    timestamp INTEGER NOT NULL,
                    sender_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
                CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id);",
            )?;
            Ok(())
        })
    }

    /// Insert the sender if unseen, refresh their color, return their row id.
    fn upsert_user(conn: &Connection, sender: &str, color: DisplayColor) -> StoreResult<i64> {
        let id = conn.query_row(
            "INSERT INTO users (sender, sender_color) VALUES (?1, ?2)
             ON CONFLICT(sender) DO UPDATE SET sender_color = excluded.sender_color
             RETURNING id",
            params![sender, color.name()],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

fn decode_timestamp(millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| StoreError::CorruptRow {
        field: "timestamp",
        value: millis.to_string(),
    })
}

fn decode_color(name: String) -> StoreResult<DisplayColor> {
    name.parse().map_err(|_| StoreError::CorruptRow {
        field: "sender_color",
        value: name,
    })
}

impl HistoryStore for SqliteHistory {
    fn append(&self, message: &ChatMessage) -> StoreResult<()> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let sender_id = Self::upsert_user(&tx, &message.sender, message.sender_color)?;
            tx.execute(
                "INSERT INTO messages (content, timestamp, sender_id) VALUES (?1, ?2, ?3)",
                params![
                    message.content,
                    message.timestamp.timestamp_millis(),
                    sender_id
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn query(&self, query: &HistoryQuery) -> StoreResult<Vec<ChatMessage>> {
        let mut sql = String::from(
            "SELECT users.sender, messages.content, messages.timestamp, users.sender_color
             FROM messages JOIN users ON messages.sender_id = users.id
             WHERE 1=1",
        );
        let from = query.from.map(|t| t.timestamp_millis());
        let to = query.to.map(|t| t.timestamp_millis());
        let mut args: Vec<&dyn ToSql> = Vec::new();

        if let Some(sender) = &query.sender {
            args.push(sender);
            sql.push_str(&format!(" AND users.sender = ?{}", args.len()));
        }
        if let Some(from) = &from {
            args.push(from);
            sql.push_str(&format!(" AND messages.timestamp >= ?{}", args.len()));
        }
        if let Some(to) = &to {
            args.push(to);
            sql.push_str(&format!(" AND messages.timestamp <= ?{}", args.len()));
        }
        sql.push_str(" ORDER BY messages.timestamp ASC, messages.id ASC");

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(args.as_slice(), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(sender, content, millis, color)| -> StoreResult<ChatMessage> {
                    Ok(ChatMessage {
                        sender,
                        content,
                        timestamp: decode_timestamp(millis)?,
                        sender_color: decode_color(color)?,
                    })
                })
                .collect()
        })
    }

    fn delete_sender(&self, sender: &str) -> StoreResult<usize> {
        self.db.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM messages
                 WHERE sender_id IN (SELECT id FROM users WHERE sender = ?1)",
                params![sender],
            )?;
            Ok(deleted)
        })
    }

    fn stats(&self) -> StoreResult<ChatStats> {
        self.db.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;

            let mut stmt = conn.prepare(
                "SELECT users.sender, COUNT(*)
                 FROM messages JOIN users ON messages.sender_id = users.id
                 GROUP BY users.sender",
            )?;
            let per_sender = stmt
                .query_map([], |row| {
                    Ok(SenderCount {
                        sender: row.get(0)?,
                        messages: row.get::<_, i64>(1)? as u64,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ChatStats::from_counts(total as u64, per_sender))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32, sender: &str, content: &str) -> ChatMessage {
        ChatMessage {
            sender: sender.to_string(),
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            sender_color: DisplayColor::Cyan,
        }
    }

    fn seeded() -> SqliteHistory {
        let history = SqliteHistory::in_memory().unwrap();
        history.append(&at(9, "alice", "morning")).unwrap();
        history.append(&at(10, "bob", "hey")).unwrap();
        history.append(&at(11, "alice", "lunch?")).unwrap();
        history.append(&at(12, "carol", "sure")).unwrap();
        history
    }

    #[test]
    fn append_and_query_all_in_time_order() {
        let history = SqliteHistory::in_memory().unwrap();
        history.append(&at(12, "bob", "second")).unwrap();
        history.append(&at(8, "alice", "first")).unwrap();

        let all = history.query(&HistoryQuery::all()).unwrap();
        let contents: Vec<_> = all.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second"]);
        assert_eq!(all[0], at(8, "alice", "first"));
    }

    #[test]
    fn query_filters_by_sender_and_range() {
        let history = seeded();

        let alice = history.query(&HistoryQuery::by_sender("alice")).unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|m| m.sender == "alice"));

        let from = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let window = history
            .query(&HistoryQuery::between(from, from + Duration::hours(1)))
            .unwrap();
        let contents: Vec<_> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hey", "lunch?"]);

        let since = history.query(&HistoryQuery::since(from + Duration::hours(2))).unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].sender, "carol");
    }

    #[test]
    fn latest_color_wins_for_a_sender() {
        let history = SqliteHistory::in_memory().unwrap();
        history.append(&at(9, "alice", "one")).unwrap();
        let mut recolored = at(10, "alice", "two");
        recolored.sender_color = DisplayColor::Magenta;
        history.append(&recolored).unwrap();

        let all = history.query(&HistoryQuery::all()).unwrap();
        assert!(all.iter().all(|m| m.sender_color == DisplayColor::Magenta));
    }

    #[test]
    fn delete_sender_only_touches_that_sender() {
        let history = seeded();

        assert_eq!(history.delete_sender("alice").unwrap(), 2);
        assert_eq!(history.delete_sender("nobody").unwrap(), 0);

        let remaining = history.query(&HistoryQuery::all()).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|m| m.sender != "alice"));
    }

    #[test]
    fn stats_rank_senders() {
        let history = seeded();
        let stats = history.stats().unwrap();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.per_sender.len(), 3);
        assert_eq!(stats.top_senders[0].sender, "alice");
        assert_eq!(stats.top_senders[0].messages, 2);
        assert!((stats.average_per_sender - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn stats_on_empty_history() {
        let stats = SqliteHistory::in_memory().unwrap().stats().unwrap();
        assert_eq!(stats.total, 0);
        assert!(stats.top_senders.is_empty());
        assert_eq!(stats.average_per_sender, 0.0);
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.db");

        SqliteHistory::open(&path)
            .unwrap()
            .append(&at(9, "alice", "persisted"))
            .unwrap();

        let reopened = SqliteHistory::open(&path).unwrap();
        let all = reopened.query(&HistoryQuery::all()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "persisted");
    }
}

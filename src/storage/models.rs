use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter for reading back chat history. Unset fields don't constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub sender: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl HistoryQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_sender(sender: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            ..Self::default()
        }
    }

    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            ..Self::default()
        }
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderCount {
    pub sender: String,
    pub messages: u64,
}

/// Aggregate numbers over the whole chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatStats {
    pub total: u64,
    /// Every sender with at least one message, most active first.
    pub per_sender: Vec<SenderCount>,
    pub average_per_sender: f64,
    /// The three most active senders.
    pub top_senders: Vec<SenderCount>,
}

impl ChatStats {
    pub fn from_counts(total: u64, mut per_sender: Vec<SenderCount>) -> Self {
        per_sender.sort_by(|a, b| {
            b.messages
                .cmp(&a.messages)
                .then_with(|| a.sender.cmp(&b.sender))
        });
        let average_per_sender = if per_sender.is_empty() {
            0.0
        } else {
            total as f64 / per_sender.len() as f64
        };
        let top_senders = per_sender.iter().take(3).cloned().collect();

        Self {
            total,
            per_sender,
            average_per_sender,
            top_senders,
        }
    }
}

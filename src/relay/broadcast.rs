//! Broadcast coordinator
//!
//! Records each published message in the history store, then wakes every
//! client currently registered in the [`WaiterRegistry`]. Delivery to live
//! waiters is attempted even when the history append fails; the failure is
//! reported back to the publisher only.

use std::sync::Arc;

use super::registry::{WaitHandle, WaiterRegistry};
use crate::common::ChatMessage;
use crate::storage::{HistoryStore, StoreError};

/// Outcome of a successful publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Number of waiting clients that were handed the message.
    pub delivered: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Live waiters were served, but the message is missing from history.
    #[error("delivered to {delivered} waiter(s) but history append failed: {source}")]
    Persistence {
        delivered: usize,
        #[source]
        source: StoreError,
    },
}

pub struct Broadcaster {
    registry: WaiterRegistry,
    history: Arc<dyn HistoryStore>,
}

impl Broadcaster {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self {
            registry: WaiterRegistry::new(),
            history,
        }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn registry(&self) -> &WaiterRegistry {
        &self.registry
    }

    /// Wait for the next message published after this call.
    pub fn register(&self, client_id: impl Into<String>) -> WaitHandle {
        self.registry.register(client_id)
    }

    /// Persist `message`, then deliver it to every waiting client.
    ///
    /// Storage I/O happens before the registry is touched, so registrations
    /// never queue up behind a slow write.
    pub fn publish(&self, message: ChatMessage) -> Result<Delivery, PublishError> {
        let persisted = self.history.append(&message);
        let delivered = self.registry.resolve_all(&message);

        match persisted {
            Ok(()) => {
                log::info!(
                    "Message from '{}' delivered to {delivered} waiting client(s)",
                    message.sender
                );
                Ok(Delivery { delivered })
            }
            Err(source) => {
                log::error!(
                    "Message from '{}' delivered to {delivered} client(s) but not stored: {source}",
                    message.sender
                );
                Err(PublishError::Persistence { delivered, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DisplayColor;
    use crate::relay::WaitError;
    use crate::storage::{ChatStats, HistoryQuery, SqliteHistory, StoreResult};

    /// A store whose disk is always gone.
    struct Unreachable;

    impl HistoryStore for Unreachable {
        fn append(&self, _message: &ChatMessage) -> StoreResult<()> {
            Err(std::io::Error::other("storage unreachable").into())
        }

        fn query(&self, _query: &HistoryQuery) -> StoreResult<Vec<ChatMessage>> {
            Ok(Vec::new())
        }

        fn delete_sender(&self, _sender: &str) -> StoreResult<usize> {
            Ok(0)
        }

        fn stats(&self) -> StoreResult<ChatStats> {
            Ok(ChatStats::from_counts(0, Vec::new()))
        }
    }

    fn sqlite_broadcaster() -> Broadcaster {
        Broadcaster::new(Arc::new(SqliteHistory::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn publish_persists_then_wakes_waiters() {
        let broadcaster = sqlite_broadcaster();
        let alice = broadcaster.register("alice");
        let bob = broadcaster.register("bob");

        let message = ChatMessage::new("carol", "hi", DisplayColor::Red);
        let delivery = broadcaster.publish(message.clone()).unwrap();

        assert_eq!(delivery.delivered, 2);
        assert!(broadcaster.registry().is_empty());
        assert_eq!(alice.await.unwrap(), message);
        assert_eq!(bob.await.unwrap(), message);

        let stored = broadcaster.history().query(&HistoryQuery::all()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, "hi");
    }

    #[tokio::test]
    async fn publish_without_waiters_still_records_history() {
        let broadcaster = sqlite_broadcaster();
        let delivery = broadcaster
            .publish(ChatMessage::new("carol", "anyone?", DisplayColor::Red))
            .unwrap();

        assert_eq!(delivery.delivered, 0);
        assert!(broadcaster.registry().is_empty());
        assert_eq!(broadcaster.history().stats().unwrap().total, 1);
    }

    #[tokio::test]
    async fn storage_failure_still_delivers_and_reports() {
        let broadcaster = Broadcaster::new(Arc::new(Unreachable));
        let alice = broadcaster.register("alice");

        let message = ChatMessage::new("carol", "hi", DisplayColor::Red);
        let err = broadcaster.publish(message.clone()).unwrap_err();

        let PublishError::Persistence { delivered, .. } = err;
        assert_eq!(delivered, 1);
        assert_eq!(alice.await.unwrap(), message);
        assert!(broadcaster.registry().is_empty());
    }

    #[tokio::test]
    async fn replaced_waiter_never_sees_the_broadcast() {
        let broadcaster = sqlite_broadcaster();
        let first = broadcaster.register("alice");
        let second = broadcaster.register("alice");

        let message = ChatMessage::new("carol", "hi", DisplayColor::Red);
        assert_eq!(broadcaster.publish(message.clone()).unwrap().delivered, 1);

        assert_eq!(first.await, Err(WaitError::Replaced));
        assert_eq!(second.await.unwrap(), message);
    }
}

//! Waiter registry
//!
//! Maps a client id to the one outstanding wait for "the next message".
//! Each wait is a `oneshot` channel: the registry keeps the sender, the
//! caller awaits the receiver through a [`WaitHandle`].
//!
//! ```text
//! register(id)      ─► lock ─► drop old sender (if any) ─► insert new ─► unlock ─► WaitHandle
//! resolve_all(msg)  ─► lock ─► take whole map ─► unlock ─► send msg to every sender
//! WaitHandle::drop  ─► remove_if_current(id, ticket) ─► lock ─► remove on match ─► unlock
//! ```
//!
//! The mutex is only held across map mutation. Sending happens after the map
//! has been swapped out, so a woken task that immediately re-registers never
//! contends with the broadcast that woke it.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::common::ChatMessage;

/// Why a wait ended without a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    /// A newer registration under the same client id took this slot.
    #[error("wait replaced by a newer registration for the same client")]
    Replaced,
}

struct Waiter {
    ticket: u64,
    sender: oneshot::Sender<ChatMessage>,
}

#[derive(Default)]
struct Inner {
    waiters: Mutex<HashMap<String, Waiter>>,
    next_ticket: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Waiter>> {
        // The map stays consistent across a panic in another holder: every
        // critical section is a single insert, remove, or take.
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove `client_id` only while `ticket` still owns the slot.
    fn remove_if_current(&self, client_id: &str, ticket: u64) -> bool {
        let mut waiters = self.lock();
        let current = waiters
            .get(client_id)
            .is_some_and(|waiter| waiter.ticket == ticket);
        if current {
            waiters.remove(client_id);
        }
        current
    }
}

/// Registry of clients currently blocked on the next message.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct WaiterRegistry {
    inner: Arc<Inner>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client_id` to receive the next published message.
    ///
    /// Any wait already held under the same id is discarded: its sender is
    /// dropped without a value, so that caller sees [`WaitError::Replaced`].
    /// The id is opaque; the empty string is a valid key like any other.
    pub fn register(&self, client_id: impl Into<String>) -> WaitHandle {
        let client_id = client_id.into();
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        let replaced = {
            let mut waiters = self.inner.lock();
            waiters.insert(client_id.clone(), Waiter { ticket, sender })
        };

        if replaced.is_some() {
            log::debug!("Client '{client_id}' re-registered; previous wait replaced");
        } else {
            log::debug!("Client '{client_id}' registered");
        }
        // Dropping the previous sender here, outside the lock, wakes its
        // receiver with a closed-channel error.
        drop(replaced);

        WaitHandle {
            client_id,
            ticket,
            receiver,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Hand `message` to every client registered at this instant and empty
    /// the registry.
    ///
    /// Returns how many waiters actually received it. Waiters whose handle
    /// went away between the snapshot and the send are skipped.
    pub fn resolve_all(&self, message: &ChatMessage) -> usize {
        let waiters = std::mem::take(&mut *self.inner.lock());

        let mut delivered = 0;
        for (client_id, waiter) in waiters {
            if waiter.sender.send(message.clone()).is_ok() {
                log::debug!("Broadcast to client '{client_id}'");
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.inner.lock().contains_key(client_id)
    }
}

/// A pending wait for the next message.
///
/// Await it to get the message. Dropping it before resolution (client
/// disconnect, timeout) removes its registry entry, unless a newer
/// registration for the same id has already taken the slot.
#[must_use = "a wait handle does nothing unless awaited"]
pub struct WaitHandle {
    client_id: String,
    ticket: u64,
    receiver: oneshot::Receiver<ChatMessage>,
    registry: std::sync::Weak<Inner>,
}

impl Future for WaitHandle {
    type Output = Result<ChatMessage, WaitError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| WaitError::Replaced))
    }
}

impl Drop for WaitHandle {
    fn drop(&mut self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        if inner.remove_if_current(&self.client_id, self.ticket) {
            log::debug!("Client '{}' stopped waiting; entry removed", self.client_id);
        }
    }
}

//! Fan-out of relay events to connected real-time subscribers.

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Queue depth per subscriber. A subscriber that stops draining its
/// connection loses events beyond this depth rather than stalling the
/// publisher.
const SUBSCRIBER_QUEUE: usize = 16;

/// An event pushed to subscribers: a name plus a JSON payload.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// The set of connected real-time subscribers.
///
/// Each subscriber owns a bounded queue, so delivery is FIFO per
/// connection and a slow or dead connection never blocks the others.
/// Membership changes are safe against an in-flight [`publish`](Self::publish):
/// a connection added mid-publish receives either that event or the next
/// one, never a partial frame.
pub struct BroadcastHub {
    subscribers: DashMap<Uuid, mpsc::Sender<Event>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Register a subscriber, returning its identity and the receiving end
    /// of its event queue.
    pub fn subscribe(&self) -> (Uuid, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        let id = Uuid::new_v4();
        self.subscribers.insert(id, tx);
        tracing::debug!(subscriber = %id, "client connected");
        (id, rx)
    }

    /// Remove a subscriber. A no-op when it was already removed.
    pub fn unsubscribe(&self, id: &Uuid) {
        if self.subscribers.remove(id).is_some() {
            tracing::debug!(subscriber = %id, "client disconnected");
        }
    }

    /// Number of currently connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Send `data` tagged with `event` to every subscriber, best-effort.
    ///
    /// Delivery failures stay per-subscriber and are never surfaced to the
    /// caller: a full queue drops this event for that subscriber only, a
    /// closed channel prunes the subscriber. Returns the number of
    /// subscribers the event was queued for.
    pub fn publish(&self, event: &str, data: serde_json::Value) -> usize {
        let event = Event::new(event, data);
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscriber = %entry.key(),
                        event = %event.event,
                        "subscriber queue full, dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Removing while iterating can deadlock on a shard, so prune
        // closed subscribers afterwards.
        for id in closed {
            self.unsubscribe(&id);
        }

        delivered
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

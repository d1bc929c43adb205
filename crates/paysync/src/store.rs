//! Single-slot transaction state shared by the push and poll paths.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A verified provider notification plus the moment it was ingested.
///
/// Provider fields are opaque to the relay and flattened back out on
/// serialization, so clients see the original payload with `received_at`
/// alongside it. Records are replaced wholesale on commit, never mutated
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Server-assigned ingestion timestamp.
    pub received_at: DateTime<Utc>,
}

/// Lifecycle of the transaction slot. Exactly one state holds at any
/// instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TransactionState {
    /// No transaction cycle has started.
    #[default]
    Empty,
    /// A cycle started via lifecycle reset; no verified webhook yet.
    Pending,
    /// A verified record is available.
    Ready(TransactionRecord),
}

/// Thread-safe single-slot store for the latest transaction.
///
/// The lock is taken only for the slot swap or clone and is never held
/// across I/O, so a broadcast or slow client cannot stall readers.
pub struct TransactionStore {
    slot: RwLock<TransactionState>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(TransactionState::Empty),
        }
    }

    /// Begin a new transaction cycle, discarding any stored record.
    ///
    /// Never broadcasts — whether subscribers are told is the caller's
    /// decision.
    pub fn reset(&self) {
        *self.write_slot() = TransactionState::Pending;
    }

    /// Store a verified provider payload, stamping the ingestion time.
    ///
    /// Returns the exact record stored so the caller can broadcast it after
    /// the lock is released; a concurrent [`read`](Self::read) observes the
    /// same record.
    pub fn commit(&self, fields: Map<String, Value>) -> TransactionRecord {
        let record = TransactionRecord {
            fields,
            received_at: Utc::now(),
        };
        *self.write_slot() = TransactionState::Ready(record.clone());
        record
    }

    /// Snapshot the current state.
    ///
    /// `None` while the slot is `Empty` or `Pending` — the "no transaction
    /// update available" signal for polling clients.
    pub fn read(&self) -> Option<TransactionRecord> {
        match &*self.read_slot() {
            TransactionState::Ready(record) => Some(record.clone()),
            TransactionState::Empty | TransactionState::Pending => None,
        }
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, TransactionState> {
        match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("transaction slot lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, TransactionState> {
        match self.slot.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("transaction slot lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

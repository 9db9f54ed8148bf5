//! Bounded append-only history of classification decisions

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::protocol::Decision;
use crate::store::{keys, PersistentStore};

/// One recorded decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEntry {
    pub timestamp: u64,
    pub id: String,
    pub decision: Decision,
    pub reason: String,
    pub text: String,
}

impl DecisionEntry {
    pub fn now(id: String, decision: Decision, reason: String, text: String) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            timestamp,
            id,
            decision,
            reason,
            text,
        }
    }
}

/// Ring buffer of decisions, persisted best-effort after each append.
pub struct DecisionLog {
    entries: VecDeque<DecisionEntry>,
    capacity: usize,
    store: Arc<dyn PersistentStore>,
}

impl DecisionLog {
    /// Load the log from the store, truncating to `capacity`.
    pub fn load(store: Arc<dyn PersistentStore>, capacity: usize) -> Self {
        let mut entries: VecDeque<DecisionEntry> = match store.get(keys::CURATION_LOG) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Discarding unreadable decision log: {}", e);
                VecDeque::new()
            }),
            Ok(None) => VecDeque::new(),
            Err(e) => {
                warn!("Decision log load failed: {}", e);
                VecDeque::new()
            }
        };
        while entries.len() > capacity {
            entries.pop_front();
        }
        debug!("Decision log loaded with {} entries", entries.len());
        Self {
            entries,
            capacity,
            store,
        }
    }

    /// Append an entry, evicting from the front past capacity. Persistence
    /// failures are logged and swallowed; logging never blocks curation.
    pub fn append(&mut self, entry: DecisionEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }

        match serde_json::to_value(&self.entries) {
            Ok(value) => {
                if let Err(e) = self.store.set(keys::CURATION_LOG, value) {
                    warn!("Decision log persistence failed: {}", e);
                }
            }
            Err(e) => warn!("Decision log serialization failed: {}", e),
        }
    }

    /// Full ordered history, oldest first.
    pub fn dump(&self) -> Vec<DecisionEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Local history store
//!
//! Holds the ordered list of every submission (oldest first) under a single
//! key of a [`KeyValueStore`]. Appends are read-modify-write of the whole
//! sequence inside one critical section.
//!
//! Stored entries are never migrated: entries written by older form variants
//! keep their original shape in storage and are only normalized when read.
//! Entries that cannot be normalized are kept in storage but left out of
//! [`HistoryStore::load`].

use bouquet_common::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::PersistenceFailure;
use crate::record::FeedbackRecord;
use crate::schema::{normalize, Draft};
use crate::storage::KeyValueStore;

/// Result of one append
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    /// The appended record, with `submitted_at` stamped
    pub record: FeedbackRecord,
    /// The full history after the append
    pub records: Vec<FeedbackRecord>,
    /// Whether the new sequence reached durable storage
    pub persisted: std::result::Result<(), PersistenceFailure>,
}

struct HistoryState {
    /// Every stored entry, exactly as stored
    raw: Vec<Value>,
    /// Entries that normalized successfully, in order
    records: Vec<FeedbackRecord>,
}

/// Ordered, append-only feedback history
pub struct HistoryStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    state: Mutex<HistoryState>,
}

impl HistoryStore {
    /// Read the history slot once and keep it in memory
    ///
    /// A missing key is an empty history. A slot that does not hold a JSON
    /// array is an error: overwriting it would destroy data.
    pub async fn open(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();

        let raw = match backend.get(&key).await? {
            None => Vec::new(),
            Some(text) => match serde_json::from_str::<Value>(&text)? {
                Value::Array(entries) => entries,
                other => {
                    return Err(Error::Internal(format!(
                        "history slot '{}' holds {} instead of a list",
                        key,
                        json_kind(&other)
                    )))
                }
            },
        };

        let records = decode_entries(&raw);
        info!(
            key = %key,
            stored = raw.len(),
            readable = records.len(),
            "Loaded feedback history"
        );

        Ok(Self {
            backend,
            key,
            state: Mutex::new(HistoryState { raw, records }),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current history, oldest first
    pub async fn load(&self) -> Vec<FeedbackRecord> {
        self.state.lock().await.records.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stamp `submitted_at`, append, and write the whole sequence back
    ///
    /// The record stays in the in-memory history even when the write fails;
    /// the next successful write persists it along with everything before it.
    pub async fn append(&self, record: FeedbackRecord) -> AppendOutcome {
        let mut state = self.state.lock().await;

        let stamped = record.stamped(bouquet_common::time::now());
        state.raw.push(Draft::from(&stamped).into_value());
        state.records.push(stamped.clone());

        let persisted = match serde_json::to_string(&state.raw) {
            Ok(text) => self.backend.set(&self.key, &text).await.map_err(|e| {
                PersistenceFailure {
                    key: self.key.clone(),
                    reason: e.to_string(),
                }
            }),
            Err(e) => Err(PersistenceFailure {
                key: self.key.clone(),
                reason: e.to_string(),
            }),
        };

        match &persisted {
            Ok(()) => debug!(key = %self.key, entries = state.raw.len(), "History written"),
            Err(e) => warn!(key = %self.key, error = %e, "History write failed"),
        }

        AppendOutcome {
            record: stamped,
            records: state.records.clone(),
            persisted,
        }
    }
}

fn decode_entries(raw: &[Value]) -> Vec<FeedbackRecord> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let decoded = Draft::from_value(entry.clone())
                .map_err(crate::error::SubmitError::from)
                .and_then(|draft| normalize(&draft));
            match decoded {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index, error = %e, "Skipping unreadable history entry");
                    None
                }
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

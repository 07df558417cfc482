//! Submission pipeline
//!
//! validate → normalize → relay (best-effort) → append to history.
//!
//! Only validation and schema errors stop a submission. Once a draft
//! normalizes, the submission is accepted: relay and storage failures are
//! logged and returned as warnings, because the local history is the system
//! of record for the respondent.

use bouquet_common::config::RelayMode;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{PersistenceFailure, SubmissionWarning, SubmitError, TransportFailure};
use crate::history::HistoryStore;
use crate::record::FeedbackRecord;
use crate::relay::Relay;
use crate::schema::{Draft, DraftFields};

/// Result of an accepted submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub accepted: bool,
    /// The record as appended, `submitted_at` stamped
    pub record: FeedbackRecord,
    pub warnings: Vec<SubmissionWarning>,
    /// History length after the append
    pub history_len: usize,
}

impl SubmissionOutcome {
    pub fn transport_failure(&self) -> Option<&TransportFailure> {
        self.warnings.iter().find_map(|w| match w {
            SubmissionWarning::Transport(e) => Some(e),
            _ => None,
        })
    }

    pub fn persistence_failure(&self) -> Option<&PersistenceFailure> {
        self.warnings.iter().find_map(|w| match w {
            SubmissionWarning::Persistence(e) => Some(e),
            _ => None,
        })
    }
}

/// Orchestrates one submission at a time against an owned history store
pub struct SubmissionPipeline {
    history: Arc<HistoryStore>,
    relay: Arc<dyn Relay>,
    mode: RelayMode,
}

impl SubmissionPipeline {
    pub fn new(history: Arc<HistoryStore>, relay: Arc<dyn Relay>) -> Self {
        Self {
            history,
            relay,
            mode: RelayMode::Awaited,
        }
    }

    pub fn with_mode(mut self, mode: RelayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Submit a draft
    ///
    /// Returns `Err` only for validation or schema problems, before any
    /// network or storage activity. Otherwise the record is appended and the
    /// outcome is accepted.
    pub async fn submit(&self, draft: &Draft) -> Result<SubmissionOutcome, SubmitError> {
        let fields = DraftFields::from_draft(draft)?;
        fields.validate()?;
        let record = fields.into_record()?;

        let mut warnings = Vec::new();

        match self.mode {
            RelayMode::Awaited => {
                if let Err(e) = self.relay.send(&record).await {
                    warn!(subject = %record.subject_name, error = %e, "Relay failed, keeping local copy");
                    warnings.push(SubmissionWarning::Transport(e));
                }
            }
            RelayMode::Detached => {
                let relay = self.relay.clone();
                let pending = record.clone();
                tokio::spawn(async move {
                    if let Err(e) = relay.send(&pending).await {
                        warn!(subject = %pending.subject_name, error = %e, "Detached relay failed");
                    }
                });
            }
        }

        let appended = self.history.append(record).await;
        if let Err(e) = appended.persisted {
            warnings.push(SubmissionWarning::Persistence(e));
        }

        info!(
            subject = %appended.record.subject_name,
            rating = appended.record.rating.value(),
            history_len = appended.records.len(),
            warnings = warnings.len(),
            "Feedback submitted"
        );

        Ok(SubmissionOutcome {
            accepted: true,
            record: appended.record,
            warnings,
            history_len: appended.records.len(),
        })
    }
}

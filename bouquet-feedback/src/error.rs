//! Error types for the feedback core
//!
//! Only [`SubmitError`] stops a submission. Transport and persistence
//! failures are carried back to the caller as [`SubmissionWarning`]s.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Canonical field identity, used to point errors at a form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SubjectName,
    Satisfied,
    Rating,
    Comment,
    SubmittedAt,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::SubjectName => "subjectName",
            Field::Satisfied => "satisfied",
            Field::Rating => "rating",
            Field::Comment => "comment",
            Field::SubmittedAt => "submittedAt",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single reason a draft cannot be submitted yet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldIssue {
    #[error("bouquet name is required")]
    EmptySubjectName,

    #[error("choose whether you are satisfied")]
    SatisfactionNotChosen,

    #[error("select a rating")]
    RatingUnset,

    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),

    #[error("comment is required")]
    EmptyComment,
}

impl FieldIssue {
    pub fn field(&self) -> Field {
        match self {
            FieldIssue::EmptySubjectName => Field::SubjectName,
            FieldIssue::SatisfactionNotChosen => Field::Satisfied,
            FieldIssue::RatingUnset | FieldIssue::RatingOutOfRange(_) => Field::Rating,
            FieldIssue::EmptyComment => Field::Comment,
        }
    }
}

impl Serialize for FieldIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FieldIssue", 2)?;
        state.serialize_field("field", &self.field())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Draft is incomplete or out of range; the form stays editable
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("invalid feedback: {}", describe(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Offending fields, in form order
    pub fn fields(&self) -> Vec<Field> {
        self.issues.iter().map(FieldIssue::field).collect()
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.issues.iter().any(|issue| issue.field() == field)
    }
}

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field(), issue))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Draft shape is not one the normalizer recognizes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("draft must be a JSON object")]
    NotAnObject,

    #[error("unrecognized field '{0}'")]
    UnknownField(String),

    #[error("field {field} supplied twice (as '{first}' and '{second}')")]
    DuplicateField {
        field: Field,
        first: String,
        second: String,
    },

    #[error("missing field {0}: none of its aliases are present")]
    MissingField(Field),

    #[error("field {field} has an unusable value: {reason}")]
    InvalidValue { field: Field, reason: String },
}

/// Hard stop for a submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// The best-effort relay did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("collector did not answer within {0} seconds")]
    Timeout(u64),

    #[error("collector returned HTTP {0}")]
    Status(u16),

    #[error("collector response unreadable: {0}")]
    UnreadableResponse(String),

    #[error("could not encode payload: {0}")]
    Encode(String),
}

/// Writing the history back to durable storage failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("history not saved under '{key}': {reason}")]
pub struct PersistenceFailure {
    pub key: String,
    pub reason: String,
}

/// Non-blocking problem observed while completing a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionWarning {
    /// The record did not reach the remote collector
    Transport(TransportFailure),
    /// The record may be lost on reload
    Persistence(PersistenceFailure),
}

impl SubmissionWarning {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionWarning::Transport(_) => "transport",
            SubmissionWarning::Persistence(_) => "persistence",
        }
    }
}

impl fmt::Display for SubmissionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionWarning::Transport(e) => write!(f, "{}", e),
            SubmissionWarning::Persistence(e) => write!(f, "{}", e),
        }
    }
}

impl Serialize for SubmissionWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SubmissionWarning", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

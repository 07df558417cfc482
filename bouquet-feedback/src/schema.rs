//! Schema normalizer
//!
//! The historical form variants posted the same four answers under different
//! keys (`name` / `bouquetName` / `Nazwa_bukietu`, `isHappy` / `Zadowolon`, ...)
//! and with localized values (`Tak` / `Nie`). This module resolves every
//! recognized alias to one canonical [`FeedbackRecord`] and rejects anything
//! it does not recognize.
//!
//! Normalization happens in three steps so the pipeline can validate before
//! doing any I/O:
//! 1. [`DraftFields::from_draft`] resolves aliases and coerces values
//!    ([`SchemaError`] on unknown shapes)
//! 2. [`DraftFields::validate`] checks required fields and ranges
//!    ([`ValidationError`])
//! 3. [`DraftFields::into_record`] builds the record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Field, FieldIssue, SchemaError, SubmitError, ValidationError};
use crate::record::{FeedbackRecord, Rating, Satisfaction};

/// Recognized keys per canonical field. The canonical name comes first.
const ALIASES: &[(Field, &[&str])] = &[
    (
        Field::SubjectName,
        &[
            "subjectName",
            "subject_name",
            "name",
            "bouquetName",
            "bouquet_name",
            "Nazwa_bukietu",
        ],
    ),
    (
        Field::Satisfied,
        &["satisfied", "isHappy", "is_happy", "Zadowolon", "Zadowolony"],
    ),
    (Field::Rating, &["rating", "Ocena"]),
    (Field::Comment, &["comment", "feedback", "Komentarz"]),
    (Field::SubmittedAt, &["submittedAt", "submitted_at", "timestamp"]),
];

/// Canonical field for an input key, if the key is a known alias
pub fn field_for_key(key: &str) -> Option<Field> {
    ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key))
        .map(|(field, _)| *field)
}

/// Raw form input as submitted by any form variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft(Map<String, Value>);

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(SchemaError::NotAnObject),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<&FeedbackRecord> for Draft {
    fn from(record: &FeedbackRecord) -> Self {
        let mut draft = Draft::new()
            .with("subjectName", record.subject_name.as_str())
            .with("satisfied", record.satisfied.as_str())
            .with("rating", record.rating.value())
            .with("comment", record.comment.as_str());
        if record.submitted_at.is_some() {
            draft.insert("submittedAt", record.submitted_at_string());
        }
        draft
    }
}

/// Draft values resolved to canonical fields, possibly still incomplete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftFields {
    pub subject_name: String,
    pub satisfied: Option<Satisfaction>,
    /// 0 means unset
    pub rating: i64,
    pub comment: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl DraftFields {
    /// Resolve aliases and coerce values
    ///
    /// Every key must be a recognized alias, each canonical field may appear
    /// under at most one alias, and the four answer fields must be present.
    /// Empty values are accepted here and reported by [`Self::validate`].
    pub fn from_draft(draft: &Draft) -> Result<Self, SchemaError> {
        let mut slots: Vec<(Field, &str, &Value)> = Vec::with_capacity(draft.0.len());

        for (key, value) in draft.as_map() {
            let field =
                field_for_key(key).ok_or_else(|| SchemaError::UnknownField(key.clone()))?;
            if let Some((_, first, _)) = slots.iter().find(|(f, _, _)| *f == field) {
                return Err(SchemaError::DuplicateField {
                    field,
                    first: first.to_string(),
                    second: key.clone(),
                });
            }
            slots.push((field, key.as_str(), value));
        }

        let lookup = |field: Field| {
            slots
                .iter()
                .find(|(f, _, _)| *f == field)
                .map(|(_, _, value)| *value)
        };
        let required = |field: Field| lookup(field).ok_or(SchemaError::MissingField(field));

        Ok(Self {
            subject_name: coerce_text(Field::SubjectName, required(Field::SubjectName)?)?,
            satisfied: coerce_satisfaction(required(Field::Satisfied)?)?,
            rating: coerce_rating(required(Field::Rating)?)?,
            comment: coerce_text(Field::Comment, required(Field::Comment)?)?,
            submitted_at: lookup(Field::SubmittedAt)
                .map(coerce_timestamp)
                .transpose()?
                .flatten(),
        })
    }

    /// Check required fields and the rating range
    ///
    /// All problems are reported at once, in form order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.subject_name.is_empty() {
            issues.push(FieldIssue::EmptySubjectName);
        }
        if self.satisfied.is_none() {
            issues.push(FieldIssue::SatisfactionNotChosen);
        }
        if self.rating == 0 {
            issues.push(FieldIssue::RatingUnset);
        } else if Rating::try_from(self.rating).is_err() {
            issues.push(FieldIssue::RatingOutOfRange(self.rating));
        }
        if self.comment.is_empty() {
            issues.push(FieldIssue::EmptyComment);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Build the canonical record (validates first)
    pub fn into_record(self) -> Result<FeedbackRecord, ValidationError> {
        self.validate()?;

        // validate() guarantees both of these
        let (Some(satisfied), Ok(rating)) = (self.satisfied, Rating::try_from(self.rating)) else {
            return Err(ValidationError {
                issues: vec![FieldIssue::RatingOutOfRange(self.rating)],
            });
        };

        Ok(FeedbackRecord {
            subject_name: self.subject_name,
            satisfied,
            rating,
            comment: self.comment,
            submitted_at: self.submitted_at,
        })
    }
}

/// Map any recognized draft shape to a canonical record
pub fn normalize(draft: &Draft) -> Result<FeedbackRecord, SubmitError> {
    let fields = DraftFields::from_draft(draft)?;
    Ok(fields.into_record()?)
}

fn invalid(field: Field, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn coerce_text(field: Field, value: &Value) -> Result<String, SchemaError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Null => Ok(String::new()),
        other => Err(invalid(field, format!("expected text, got {}", other))),
    }
}

fn coerce_satisfaction(value: &Value) -> Result<Option<Satisfaction>, SchemaError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(true) => Ok(Some(Satisfaction::Yes)),
        Value::Bool(false) => Ok(Some(Satisfaction::No)),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Satisfaction::parse_localized(s)
            .map(Some)
            .ok_or_else(|| invalid(Field::Satisfied, format!("'{}' is not a yes/no answer", s))),
        Value::Number(n) => Satisfaction::parse_localized(&n.to_string())
            .map(Some)
            .ok_or_else(|| invalid(Field::Satisfied, format!("{} is not a yes/no answer", n))),
        other => Err(invalid(
            Field::Satisfied,
            format!("expected a yes/no answer, got {}", other),
        )),
    }
}

fn coerce_rating(value: &Value) -> Result<i64, SchemaError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(i),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e9 => Ok(f as i64),
            _ => Err(invalid(Field::Rating, format!("{} is not a whole number", n))),
        },
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(Field::Rating, format!("'{}' is not a number", s))),
        other => Err(invalid(Field::Rating, format!("expected a number, got {}", other))),
    }
}

fn coerce_timestamp(value: &Value) -> Result<Option<DateTime<Utc>>, SchemaError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => bouquet_common::time::parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| invalid(Field::SubmittedAt, format!("'{}' is not an ISO-8601 timestamp", s))),
        other => Err(invalid(
            Field::SubmittedAt,
            format!("expected a timestamp, got {}", other),
        )),
    }
}

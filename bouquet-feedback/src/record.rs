//! Canonical feedback record
//!
//! Field order of [`FeedbackRecord`] is the CSV column order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Canonical column names, in record order
pub const FIELD_NAMES: [&str; 5] = ["subjectName", "satisfied", "rating", "comment", "submittedAt"];

/// Answer to "are you satisfied with the bouquet?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Satisfaction {
    Yes,
    No,
}

impl Satisfaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Satisfaction::Yes => "yes",
            Satisfaction::No => "no",
        }
    }

    /// Map an affirmative/negative answer in any supported language
    ///
    /// Returns `None` for values that are neither.
    pub fn parse_localized(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "yes" | "y" | "tak" | "true" | "1" => Some(Satisfaction::Yes),
            "no" | "n" | "nie" | "false" | "0" => Some(Satisfaction::No),
            _ => None,
        }
    }

    /// Label used by the spreadsheet relay layout
    pub fn sheet_label(&self) -> &'static str {
        match self {
            Satisfaction::Yes => "Tak",
            Satisfaction::No => "Nie",
        }
    }
}

impl fmt::Display for Satisfaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rating outside 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct RatingOutOfRange(pub i64);

/// Star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, RatingOutOfRange> {
        Self::try_from(i64::from(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(RatingOutOfRange(value))
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One submitted survey
///
/// Created by the submission pipeline once a draft validates; never modified
/// afterwards. `submitted_at` is stamped by the history store at append time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub subject_name: String,
    pub satisfied: Satisfaction,
    pub rating: Rating,
    pub comment: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_timestamp"
    )]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl FeedbackRecord {
    /// Copy of this record stamped with the given append time
    pub fn stamped(&self, at: DateTime<Utc>) -> Self {
        Self {
            submitted_at: Some(at),
            ..self.clone()
        }
    }

    /// `submittedAt` as ISO-8601, empty when unset
    pub fn submitted_at_string(&self) -> String {
        self.submitted_at
            .as_ref()
            .map(bouquet_common::time::format_timestamp)
            .unwrap_or_default()
    }
}

fn serialize_timestamp<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&bouquet_common::time::format_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}

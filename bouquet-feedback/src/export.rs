//! CSV export of the feedback history
//!
//! Output is deterministic for a given history: header row with the canonical
//! field names in record order, then one row per record in storage order.
//! An empty history produces no file.

use chrono::NaiveDate;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::history::HistoryStore;
use crate::record::{FeedbackRecord, FIELD_NAMES};
use crate::schema::{normalize, Draft};

/// MIME type of exported files
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },
}

/// A file ready to hand to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    /// Data rows, header excluded
    pub rows: usize,
}

/// `<prefix>_YYYY-MM-DD.csv`
pub fn export_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.csv", prefix, date.format("%Y-%m-%d"))
}

/// Serialize `records` to CSV; `None` when there is nothing to export
pub fn export_csv(
    records: &[FeedbackRecord],
    prefix: &str,
    date: NaiveDate,
) -> Result<Option<CsvExport>, ExportError> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(FIELD_NAMES)?;
    for record in records {
        let rating = record.rating.to_string();
        let submitted_at = record.submitted_at_string();
        writer.write_record([
            record.subject_name.as_str(),
            record.satisfied.as_str(),
            rating.as_str(),
            record.comment.as_str(),
            submitted_at.as_str(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;

    Ok(Some(CsvExport {
        filename: export_filename(prefix, date),
        content_type: CSV_CONTENT_TYPE,
        bytes,
        rows: records.len(),
    }))
}

/// Export the store's current history, dated today (UTC)
pub async fn export_history(
    history: &HistoryStore,
    prefix: &str,
) -> Result<Option<CsvExport>, ExportError> {
    let records = history.load().await;
    export_csv(&records, prefix, bouquet_common::time::today())
}

/// Read an exported file back into records
///
/// Columns are matched by header name, so their order does not matter.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<FeedbackRecord>, ExportError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let mut draft = Draft::new();
        for (header, value) in headers.iter().zip(row.iter()) {
            draft.insert(header, value);
        }
        let record = normalize(&draft).map_err(|e| ExportError::Row {
            row: index + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Destination for exported files
pub trait DownloadSink: Send + Sync {
    /// Make the file available to the user; returns where it went
    fn deliver(&self, export: &CsvExport) -> Result<PathBuf, ExportError>;
}

/// Writes exports into a directory
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, export: &CsvExport) -> Result<PathBuf, ExportError> {
        let path = self.dir.join(&export.filename);
        write_atomic_file(&path, &export.bytes)?;
        info!(path = %path.display(), rows = export.rows, "Exported feedback history");
        Ok(path)
    }
}

/// Temp file + rename, so readers never see a partial export
fn write_atomic_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let tmp = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|s| s.to_str()).unwrap_or("export"),
        std::process::id()
    ));
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

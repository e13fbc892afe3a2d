use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};

pub const FEEDBACK_CONFIRMATION: &str = "Feedback received. Thank you!";
pub const DEFAULT_EXPORT_FILE: &str = "feedback_log.csv";

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid verdict '{0}', expected Correct or Incorrect")]
    InvalidVerdict(String),
}

/// The user's judgement of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct => f.write_str("Correct"),
            Self::Incorrect => f.write_str("Incorrect"),
        }
    }
}

impl FromStr for Verdict {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "correct" | "yes" | "y" => Ok(Self::Correct),
            "incorrect" | "no" | "n" => Ok(Self::Incorrect),
            _ => Err(FeedbackError::InvalidVerdict(s.to_string())),
        }
    }
}

/// One row of user feedback. Field order is the column order of the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: String,
    pub text: String,
    pub predicted_label: String,
    pub is_correct: Verdict,
}

/// Append-only collection of feedback for one session.
#[derive(Debug, Clone)]
pub struct FeedbackStore {
    records: Vec<FeedbackRecord>,
    export_path: PathBuf,
}

impl Default for FeedbackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackStore {
    /// Exports go to `feedback_log.csv` in the system temp directory.
    pub fn new() -> Self {
        Self::with_export_path(env::temp_dir().join(DEFAULT_EXPORT_FILE))
    }

    pub fn with_export_path(path: impl Into<PathBuf>) -> Self {
        Self {
            records: Vec::new(),
            export_path: path.into(),
        }
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    /// Stores feedback as given; neither the text nor the label is validated.
    pub fn submit(&mut self, text: impl Into<String>, predicted_label: impl Into<String>, is_correct: Verdict) -> &'static str {
        let record = FeedbackRecord {
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            text: text.into(),
            predicted_label: predicted_label.into(),
            is_correct,
        };
        log::debug!("Feedback on '{}': {}", record.predicted_label, record.is_correct);
        self.records.push(record);
        FEEDBACK_CONFIRMATION
    }

    pub fn records(&self) -> &[FeedbackRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes every record to the export path, replacing any earlier export.
    ///
    /// Returns `Ok(None)` without touching the filesystem when there is
    /// nothing to export.
    pub fn export_csv(&self) -> Result<Option<PathBuf>, FeedbackError> {
        if self.records.is_empty() {
            return Ok(None);
        }

        let mut writer = csv::Writer::from_path(&self.export_path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        info!("Exported {} feedback records to {:?}", self.records.len(), self.export_path);
        Ok(Some(self.export_path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_is_permissive() {
        let mut store = FeedbackStore::with_export_path("unused.csv");
        assert_eq!(store.submit("", "not_a_label", Verdict::Incorrect), FEEDBACK_CONFIRMATION);
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].predicted_label, "not_a_label");
        assert!(store.records()[0].text.is_empty());
    }

    #[test]
    fn test_timestamp_is_iso_8601() {
        let mut store = FeedbackStore::new();
        store.submit("hi", "evasive", Verdict::Correct);
        let timestamp = &store.records()[0].timestamp;
        assert!(chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").is_ok());
    }

    #[test]
    fn test_empty_store_exports_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("feedback.csv");
        let store = FeedbackStore::with_export_path(&path);
        assert_eq!(store.export_csv()?, None);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_export_writes_header_and_quotes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("feedback.csv");
        let mut store = FeedbackStore::with_export_path(&path);
        store.submit("say \"please\", ok", "controlling", Verdict::Correct);

        let exported = store.export_csv()?.expect("records to export");
        let contents = std::fs::read_to_string(exported)?;
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("timestamp,text,predicted_label,is_correct"));
        assert!(contents.contains("\"say \"\"please\"\", ok\",controlling,Correct"));
        Ok(())
    }

    #[test]
    fn test_verdict_parsing() {
        assert_eq!("Correct".parse::<Verdict>().unwrap(), Verdict::Correct);
        assert_eq!(" incorrect ".parse::<Verdict>().unwrap(), Verdict::Incorrect);
        assert_eq!("y".parse::<Verdict>().unwrap(), Verdict::Correct);
        assert!("maybe".parse::<Verdict>().is_err());
    }
}

use std::error::Error;
use std::fs;

use linguame::{FeedbackRecord, FeedbackStore, Verdict, FEEDBACK_CONFIRMATION};

fn read_back(path: &std::path::Path) -> Result<Vec<FeedbackRecord>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[test]
fn test_export_round_trips_awkward_text() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("feedback_log.csv");
    let mut store = FeedbackStore::with_export_path(&path);

    assert_eq!(store.submit("hello, world", "evasive", Verdict::Correct), FEEDBACK_CONFIRMATION);
    assert_eq!(store.submit("line1\nline2", "controlling", Verdict::Incorrect), FEEDBACK_CONFIRMATION);

    let exported = store.export_csv()?.expect("two records");
    assert_eq!(exported, path);

    let rows = read_back(&exported)?;
    assert_eq!(rows, store.records());
    assert_eq!(rows[0].text, "hello, world");
    assert_eq!(rows[1].text, "line1\nline2");
    assert_eq!(rows[1].is_correct, Verdict::Incorrect);
    Ok(())
}

#[test]
fn test_second_export_replaces_the_first() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("feedback_log.csv");
    let mut store = FeedbackStore::with_export_path(&path);

    store.submit("first", "evasive", Verdict::Correct);
    store.export_csv()?;
    store.submit("second", "sarcastic", Verdict::Incorrect);
    store.export_csv()?;

    let rows = read_back(&path)?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].text, "first");
    assert_eq!(rows[1].text, "second");

    let contents = fs::read_to_string(&path)?;
    assert_eq!(contents.matches("timestamp,text,predicted_label,is_correct").count(), 1);
    Ok(())
}

#[test]
fn test_nothing_to_export() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("feedback_log.csv");
    let store = FeedbackStore::with_export_path(&path);

    assert!(store.export_csv()?.is_none());
    assert!(!path.exists());
    Ok(())
}

#[test]
fn test_export_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FeedbackStore::with_export_path(dir.path().join("missing").join("feedback.csv"));
    store.submit("hello", "evasive", Verdict::Correct);

    assert!(store.export_csv().is_err());
    assert_eq!(store.len(), 1);
}

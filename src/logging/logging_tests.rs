//! Tests for tracing subscriber setup.

use super::*;
use serial_test::serial;
use std::fs;

#[test]
fn file_subscriber_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("nested").join("logs");
    let log_file = log_dir.join("streamlist.log");

    let result = file_subscriber(&log_file, EnvFilter::new("info"));

    assert!(result.is_ok());
    assert!(log_dir.exists(), "Log directory should be created: {:?}", log_dir);
}

#[test]
fn file_subscriber_writes_events_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("events.log");

    let (subscriber, guard) =
        file_subscriber(&log_file, EnvFilter::new("info")).expect("subscriber");
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(items = 3, "window computed");
        tracing::debug!("filtered out");
    });
    drop(guard);

    let contents = fs::read_to_string(&log_file).expect("log file written");
    assert!(contents.contains("window computed"));
    assert!(contents.contains("items=3"));
    assert!(!contents.contains("filtered out"), "debug is below the filter");
    assert!(!contents.contains('\u{1b}'), "no ANSI escapes in log files");
}

#[test]
fn file_subscriber_rejects_path_without_file_name() {
    let result = file_subscriber(Path::new("/"), EnvFilter::new("info"));
    assert!(matches!(result, Err(LoggingError::InvalidPath(_))));
}

#[test]
fn file_subscriber_reports_unwritable_directory() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();

    let result = file_subscriber(&blocker.join("app.log"), EnvFilter::new("info"));
    assert!(matches!(result, Err(LoggingError::DirectoryCreation { .. })));
}

#[test]
#[serial(tracing_init)]
fn init_twice_reports_subscriber_already_set() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("init.log");

    // The first call may already have happened elsewhere in this process.
    let first = init(&log_file);
    let second = init(&log_file);

    assert!(matches!(second, Err(LoggingError::SubscriberAlreadySet)));
    drop(first);
}

#[test]
#[serial(rust_log)]
fn env_filter_falls_back_to_default() {
    std::env::remove_var("RUST_LOG");
    assert_eq!(env_filter().to_string(), DEFAULT_FILTER);
}

//! Lifecycle tests against the real notify backend.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tsvmap_watch::{Error, FnHandler, RuleFileWatcher, WatcherConfig, WatcherState};

type Log = Arc<Mutex<Vec<String>>>;

fn recording_watcher(dir: &TempDir) -> (RuleFileWatcher, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let changed = Arc::clone(&log);
    let deleted = Arc::clone(&log);
    let handler = FnHandler::new(
        move |path: &std::path::Path| {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            changed.lock().unwrap().push(format!("changed:{}", name));
            Ok(())
        },
        move |path: &std::path::Path| {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            deleted.lock().unwrap().push(format!("deleted:{}", name));
            Ok(())
        },
    );
    let config = WatcherConfig::new(dir.path())
        .with_debounce(Duration::from_millis(200))
        .with_delete_grace(Duration::from_millis(100))
        .with_backend_debounce(Duration::from_millis(50));
    (RuleFileWatcher::new(config, Arc::new(handler)), log)
}

async fn wait_for(log: &Log, entry: &str) -> bool {
    for _ in 0..100 {
        if log.lock().unwrap().iter().any(|e| e == entry) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_start_fails_on_missing_directory() {
    let dir = TempDir::new().unwrap();
    let config = WatcherConfig::new(dir.path().join("missing"));
    let handler = FnHandler::new(|_: &std::path::Path| Ok(()), |_: &std::path::Path| Ok(()));
    let mut watcher = RuleFileWatcher::new(config, Arc::new(handler));

    let err = watcher.start().await.unwrap_err();
    assert!(matches!(err, Error::InvalidPath(_)));
    assert_eq!(watcher.status().state, WatcherState::Stopped);
}

#[tokio::test]
async fn test_start_fails_on_regular_file() {
    let dir = TempDir::new().unwrap();
    let file: PathBuf = dir.path().join("rules.tsv");
    std::fs::write(&file, "a\tb\n").unwrap();
    let handler = FnHandler::new(|_: &std::path::Path| Ok(()), |_: &std::path::Path| Ok(()));
    let mut watcher = RuleFileWatcher::new(WatcherConfig::new(file), Arc::new(handler));

    assert!(matches!(watcher.start().await, Err(Error::InvalidPath(_))));
}

#[tokio::test]
async fn test_lifecycle_and_double_start() {
    let dir = TempDir::new().unwrap();
    let (mut watcher, _log) = recording_watcher(&dir);

    watcher.start().await.unwrap();
    let status = watcher.status();
    assert_eq!(status.state, WatcherState::Running);
    assert_eq!(status.directory, dir.path());
    assert!(matches!(watcher.start().await, Err(Error::AlreadyRunning)));

    watcher.stop().await.unwrap();
    assert_eq!(watcher.status().state, WatcherState::Stopped);
    // stopping twice is a no-op
    watcher.stop().await.unwrap();

    watcher.start().await.unwrap();
    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_file_changes_reach_handler() {
    let dir = TempDir::new().unwrap();
    let (mut watcher, log) = recording_watcher(&dir);
    watcher.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let path = dir.path().join("greetings.tsv");
    std::fs::write(&path, "hello\thi\n").unwrap();
    std::fs::write(dir.path().join("ignored.txt"), "nope").unwrap();
    assert!(wait_for(&log, "changed:greetings.tsv").await);

    std::fs::remove_file(&path).unwrap();
    assert!(wait_for(&log, "deleted:greetings.tsv").await);

    watcher.stop().await.unwrap();
    assert!(!log
        .lock()
        .unwrap()
        .iter()
        .any(|e| e.contains("ignored")));
}

//! End-to-end tests against the real inotify backend.

#![cfg(target_os = "linux")]

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use logwatch_watcher::{
    DiscoveryConfig, EventRecord, EventType, FileSink, InotifyBackend, LogDirectoryDiscovery,
    MemorySink, Monitor, MonitorConfig, read_records,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Resolves once `sink` holds a record matching `done`.
async fn wait_for(sink: MemorySink, done: impl Fn(&EventRecord) -> bool) {
    loop {
        if sink.records().iter().any(&done) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

#[tokio::test]
async fn test_discovered_directory_reports_changes() {
    let temp_dir = TempDir::new().unwrap();
    let logs = temp_dir.path().join("logs");
    fs::create_dir(&logs).unwrap();
    File::create(logs.join("app.log")).unwrap();

    let discovery = LogDirectoryDiscovery::new(DiscoveryConfig::with_roots([logs
        .to_string_lossy()
        .into_owned()]));
    let found = discovery.discover();
    assert_eq!(found, BTreeSet::from([logs.clone()]));

    let sink = MemorySink::new();
    let output = temp_dir.path().join("events.json");
    let mut monitor = Monitor::new(InotifyBackend::new().unwrap(), MonitorConfig::default())
        .with_sink(sink.clone())
        .with_sink(FileSink::open(&output).unwrap());
    assert_eq!(monitor.register_all(&found).unwrap(), 1);

    File::create(logs.join("new.log")).unwrap();
    append(&logs.join("app.log"), "hello");

    let done = wait_for(sink.clone(), |r| {
        r.filename == "app.log" && r.event_type == EventType::CloseWrite
    });
    let stats = tokio::time::timeout(Duration::from_secs(10), monitor.run(done))
        .await
        .unwrap()
        .unwrap();

    let records = sink.records();
    let logs_path = logs.to_string_lossy().into_owned();
    assert!(records.iter().all(|r| r.path == logs_path));

    let creates: Vec<_> = records
        .iter()
        .filter(|r| r.event_type == EventType::Create)
        .collect();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].filename, "new.log");

    let modify = records
        .iter()
        .find(|r| r.filename == "app.log" && r.event_type == EventType::Modify)
        .unwrap();
    assert_eq!(modify.size, 5);

    assert_eq!(stats.registered, 1);
    assert_eq!(stats.released, stats.registered);
    assert_eq!(read_records(&output).unwrap(), records);
}

#[tokio::test]
async fn test_missing_directory_does_not_stop_monitoring() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing");

    let sink = MemorySink::new();
    let mut monitor = Monitor::new(InotifyBackend::new().unwrap(), MonitorConfig::default())
        .with_sink(sink.clone());
    let count = monitor
        .register_all([missing.as_path(), temp_dir.path()])
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(monitor.directories(), vec![temp_dir.path().to_path_buf()]);

    File::create(temp_dir.path().join("error.log")).unwrap();

    let done = wait_for(sink.clone(), |r| r.event_type == EventType::CloseWrite);
    tokio::time::timeout(Duration::from_secs(10), monitor.run(done))
        .await
        .unwrap()
        .unwrap();

    let first = &sink.records()[0];
    assert_eq!(first.event_type, EventType::Create);
    assert_eq!(first.filename, "error.log");
}

#[tokio::test]
async fn test_configured_mask_limits_events() {
    let temp_dir = TempDir::new().unwrap();
    let app = temp_dir.path().join("app.log");
    let db = temp_dir.path().join("db.log");
    File::create(&app).unwrap();
    File::create(&db).unwrap();

    let sink = MemorySink::new();
    let config = MonitorConfig::default().with_events([EventType::CloseWrite]);
    let mut monitor =
        Monitor::new(InotifyBackend::new().unwrap(), config).with_sink(sink.clone());
    monitor.register_all([temp_dir.path()]).unwrap();

    // Different files, so the kernel cannot merge the two notifications.
    append(&app, "one\n");
    append(&db, "two\n");

    let counter = sink.clone();
    let done = async move {
        while counter.len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), monitor.run(done))
        .await
        .unwrap()
        .unwrap();

    let seen: Vec<_> = sink
        .records()
        .into_iter()
        .map(|r| (r.event_type, r.filename))
        .collect();
    assert_eq!(
        seen,
        vec![
            (EventType::CloseWrite, "app.log".to_string()),
            (EventType::CloseWrite, "db.log".to_string()),
        ]
    );
}

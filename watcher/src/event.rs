//! Normalized file events produced by the monitor.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in every record: ISO-8601, local time, microseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Kind of change reported for a file inside a watched directory.
///
/// The serialized names are part of the output file format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// File was created.
    Create,

    /// File contents were modified.
    Modify,

    /// File was deleted.
    Delete,

    /// File was moved into the directory.
    MovedTo,

    /// File was moved out of the directory.
    MovedFrom,

    /// File opened for writing was closed.
    CloseWrite,
}

impl EventType {
    /// Every event type, in the order they are matched against OS flags.
    pub const ALL: [EventType; 6] = [
        EventType::Create,
        EventType::Modify,
        EventType::Delete,
        EventType::MovedTo,
        EventType::MovedFrom,
        EventType::CloseWrite,
    ];

    /// Name used in output.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Create => "CREATE",
            EventType::Modify => "MODIFY",
            EventType::Delete => "DELETE",
            EventType::MovedTo => "MOVED_TO",
            EventType::MovedFrom => "MOVED_FROM",
            EventType::CloseWrite => "CLOSE_WRITE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filesystem change, ready to be written to sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// When the change was observed.
    pub timestamp: String,

    /// Watched directory containing the file.
    pub path: String,

    /// Bare file name.
    pub filename: String,

    /// What happened.
    pub event_type: EventType,

    /// File size in bytes, `0` if it could not be read.
    pub size: u64,
}

impl EventRecord {
    /// Build a record with an explicit observation time.
    pub fn new(
        timestamp: DateTime<Local>,
        dir: &Path,
        filename: impl Into<String>,
        event_type: EventType,
        size: u64,
    ) -> Self {
        Self {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            path: dir.to_string_lossy().into_owned(),
            filename: filename.into(),
            event_type,
            size,
        }
    }

    /// Build a record for `dir/filename` as it looks right now.
    ///
    /// The size is read best-effort: a file that vanished or cannot be
    /// stat'ed is reported with size `0`.
    pub fn observe(dir: &Path, filename: impl Into<String>, event_type: EventType) -> Self {
        let filename = filename.into();
        let size = if filename.is_empty() {
            0
        } else {
            file_size(&dir.join(&filename))
        };
        Self::new(Local::now(), dir, filename, event_type, size)
    }

    /// Full path of the affected file.
    pub fn full_path(&self) -> String {
        if self.filename.is_empty() {
            self.path.clone()
        } else {
            Path::new(&self.path)
                .join(&self.filename)
                .to_string_lossy()
                .into_owned()
        }
    }

    /// One-line human readable form.
    pub fn summary(&self) -> String {
        format!(
            "{} - {} - {}",
            self.timestamp,
            self.event_type,
            self.full_path()
        )
    }
}

fn file_size(path: &Path) -> u64 {
    path.metadata().map(|m| m.len()).unwrap_or(0)
}

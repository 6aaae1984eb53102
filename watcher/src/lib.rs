//! # Log Watcher
//!
//! Finds log directories on a Linux host and reports every change inside
//! them as a structured event record.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Log Watcher                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  DiscoveryConfig ──► LogDirectoryDiscovery ──► directory set      │
//! │                                                   │              │
//! │                                                   ▼              │
//! │  WatchBackend (inotify) ──► RawEvent ──► Monitor ──► EventRecord │
//! │                                                   │              │
//! │                                                   ▼              │
//! │                               ConsoleSink / FileSink / MemorySink│
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod discovery;
pub mod error;
pub mod event;
pub mod monitor;
pub mod sink;

#[cfg(target_os = "linux")]
pub use backend::InotifyBackend;
pub use backend::{RawEvent, RawEventKind, WatchBackend, WatchHandle};
pub use config::{DiscoveryConfig, LogWatchConfig, MonitorConfig};
pub use discovery::{DirectoryCandidate, LogDirectoryDiscovery};
pub use error::{Result, WatcherError};
pub use event::{EventRecord, EventType};
pub use monitor::{Monitor, MonitorStats};
pub use sink::{ConsoleSink, EventSink, FileSink, MemorySink, read_records};

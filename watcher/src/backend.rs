//! Adapter over the operating system's directory change notifications.
//!
//! The monitor only talks to a [`WatchBackend`]; the Linux implementation
//! binds inotify directly, and tests substitute scripted backends.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::event::EventType;

#[cfg(target_os = "linux")]
mod inotify;

#[cfg(target_os = "linux")]
pub use self::inotify::InotifyBackend;

/// Opaque handle for a registered watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(u64);

impl WatchHandle {
    /// Wrap a backend-specific identifier.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The backend-specific identifier.
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a raw notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    /// A change within the requested mask.
    Change(EventType),

    /// The OS dropped the watch (directory deleted or unmounted).
    WatchRemoved,

    /// The OS event queue overflowed and events were lost.
    Overflow,

    /// Anything else the OS reported.
    Other,
}

/// A notification as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Watch the event originated from; `None` for queue-wide events.
    pub handle: Option<WatchHandle>,

    /// What happened.
    pub kind: RawEventKind,

    /// Affected file name, relative to the watched directory.
    pub name: Option<OsString>,
}

impl RawEvent {
    /// A change to `name` inside the directory watched by `handle`.
    pub fn change(handle: WatchHandle, event_type: EventType, name: impl Into<OsString>) -> Self {
        Self {
            handle: Some(handle),
            kind: RawEventKind::Change(event_type),
            name: Some(name.into()),
        }
    }
}

/// Binding to a native change notification facility.
#[async_trait]
pub trait WatchBackend: Send {
    /// Start watching `path` for the given event types.
    fn register(&mut self, path: &Path, events: &[EventType]) -> Result<WatchHandle>;

    /// Wait for the next notification. Waits indefinitely.
    async fn read_next(&mut self) -> Result<RawEvent>;

    /// Stop watching. Releasing a watch the OS already dropped succeeds.
    fn release(&mut self, handle: WatchHandle) -> Result<()>;
}

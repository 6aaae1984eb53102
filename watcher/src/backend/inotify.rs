//! inotify binding for Linux.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use ::inotify::{EventMask, EventStream, Inotify, WatchDescriptor, WatchMask};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use super::{RawEvent, RawEventKind, WatchBackend, WatchHandle};
use crate::error::{Result, WatcherError};
use crate::event::EventType;

/// Large enough for several events with names up to NAME_MAX.
const BUFFER_SIZE: usize = 4096;

/// Watch backend reading from an inotify instance.
///
/// The inotify descriptor is closed when the backend is dropped, which also
/// releases every watch still registered on it.
pub struct InotifyBackend {
    stream: EventStream<[u8; BUFFER_SIZE]>,
    descriptors: HashMap<WatchHandle, WatchDescriptor>,
    handles: HashMap<WatchDescriptor, WatchHandle>,
    next_id: u64,
}

impl InotifyBackend {
    /// Open a new inotify instance. Must be called inside a tokio runtime.
    pub fn new() -> Result<Self> {
        let inotify = Inotify::init()?;
        let stream = inotify.into_event_stream([0u8; BUFFER_SIZE])?;

        Ok(Self {
            stream,
            descriptors: HashMap::new(),
            handles: HashMap::new(),
            next_id: 1,
        })
    }

    /// Number of watches currently held.
    pub fn watch_count(&self) -> usize {
        self.descriptors.len()
    }

    fn forget(&mut self, handle: WatchHandle) {
        if let Some(wd) = self.descriptors.remove(&handle) {
            self.handles.remove(&wd);
        }
    }
}

#[async_trait]
impl WatchBackend for InotifyBackend {
    fn register(&mut self, path: &Path, events: &[EventType]) -> Result<WatchHandle> {
        let wd = self
            .stream
            .watches()
            .add(path, watch_mask(events))
            .map_err(|e| WatcherError::from_watch_io(path, e))?;

        // The kernel hands out one descriptor per inode.
        if let Some(handle) = self.handles.get(&wd) {
            return Ok(*handle);
        }

        let handle = WatchHandle::new(self.next_id);
        self.next_id += 1;
        self.descriptors.insert(handle, wd.clone());
        self.handles.insert(wd, handle);

        Ok(handle)
    }

    async fn read_next(&mut self) -> Result<RawEvent> {
        let event = self
            .stream
            .next()
            .await
            .ok_or(WatcherError::SourceClosed)??;

        let handle = self.handles.get(&event.wd).copied();
        let kind = classify(event.mask);

        if kind == RawEventKind::WatchRemoved {
            if let Some(handle) = handle {
                debug!("Kernel removed watch {handle}");
                self.forget(handle);
            }
        }

        Ok(RawEvent {
            handle,
            kind,
            name: event.name,
        })
    }

    fn release(&mut self, handle: WatchHandle) -> Result<()> {
        let wd = self
            .descriptors
            .remove(&handle)
            .ok_or(WatcherError::UnknownHandle(handle))?;
        self.handles.remove(&wd);

        match self.stream.watches().remove(wd) {
            Ok(()) => Ok(()),
            // EINVAL: the kernel dropped the watch before we did.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn watch_mask(events: &[EventType]) -> WatchMask {
    events
        .iter()
        .fold(WatchMask::ONLYDIR, |mask, event_type| {
            mask | match event_type {
                EventType::Create => WatchMask::CREATE,
                EventType::Modify => WatchMask::MODIFY,
                EventType::Delete => WatchMask::DELETE,
                EventType::MovedTo => WatchMask::MOVED_TO,
                EventType::MovedFrom => WatchMask::MOVED_FROM,
                EventType::CloseWrite => WatchMask::CLOSE_WRITE,
            }
        })
}

fn event_mask(event_type: EventType) -> EventMask {
    match event_type {
        EventType::Create => EventMask::CREATE,
        EventType::Modify => EventMask::MODIFY,
        EventType::Delete => EventMask::DELETE,
        EventType::MovedTo => EventMask::MOVED_TO,
        EventType::MovedFrom => EventMask::MOVED_FROM,
        EventType::CloseWrite => EventMask::CLOSE_WRITE,
    }
}

fn classify(mask: EventMask) -> RawEventKind {
    if mask.contains(EventMask::Q_OVERFLOW) {
        return RawEventKind::Overflow;
    }
    if mask.contains(EventMask::IGNORED) {
        return RawEventKind::WatchRemoved;
    }

    EventType::ALL
        .into_iter()
        .find(|event_type| mask.contains(event_mask(*event_type)))
        .map_or(RawEventKind::Other, RawEventKind::Change)
}

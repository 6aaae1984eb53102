//! The monitor loop: watches directories and dispatches event records.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::backend::{RawEvent, RawEventKind, WatchBackend, WatchHandle};
use crate::config::MonitorConfig;
use crate::error::{Result, WatcherError};
use crate::event::EventRecord;
use crate::sink::EventSink;

/// Counters describing a monitor's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Watches successfully registered.
    pub registered: usize,

    /// Watches released, by us or by the OS.
    pub released: usize,

    /// Event records dispatched to sinks.
    pub events: usize,

    /// Individual sink writes that failed.
    pub sink_errors: usize,
}

/// Watches a set of directories and forwards every change to its sinks.
pub struct Monitor<B: WatchBackend> {
    backend: B,
    config: MonitorConfig,
    watches: HashMap<WatchHandle, PathBuf>,
    sinks: Vec<Box<dyn EventSink>>,
    stats: MonitorStats,
}

impl<B: WatchBackend> Monitor<B> {
    /// Create a monitor on top of a watch backend.
    pub fn new(backend: B, config: MonitorConfig) -> Self {
        Self {
            backend,
            config,
            watches: HashMap::new(),
            sinks: Vec::new(),
            stats: MonitorStats::default(),
        }
    }

    /// Add an output sink. Sinks receive records in the order they were added.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Builder form of [`Monitor::add_sink`].
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.add_sink(Box::new(sink));
        self
    }

    /// Start watching a directory.
    pub fn add_directory(&mut self, path: &Path) -> Result<WatchHandle> {
        if self.config.events.is_empty() {
            return Err(WatcherError::Config("no event types selected".to_string()));
        }
        if self.watches.values().any(|watched| watched == path) {
            return Err(WatcherError::AlreadyWatching(path.display().to_string()));
        }

        let handle = self.backend.register(path, &self.config.events)?;
        if let Some(existing) = self.watches.get(&handle) {
            // Same inode under another name; the OS shares the watch.
            debug!(
                "{} resolves to the watch on {}",
                path.display(),
                existing.display()
            );
            return Err(WatcherError::AlreadyWatching(path.display().to_string()));
        }

        self.watches.insert(handle, path.to_path_buf());
        self.stats.registered += 1;
        info!("Added watch for directory: {}", path.display());

        Ok(handle)
    }

    /// Stop watching a directory.
    pub fn remove_directory(&mut self, path: &Path) -> Result<()> {
        let handle = self
            .watches
            .iter()
            .find_map(|(handle, watched)| (watched == path).then_some(*handle))
            .ok_or_else(|| WatcherError::DirectoryNotFound(path.display().to_string()))?;

        self.backend.release(handle)?;
        self.watches.remove(&handle);
        self.stats.released += 1;
        info!("Removed watch for directory: {}", path.display());

        Ok(())
    }

    /// Register every directory, warning about the ones that fail.
    ///
    /// Returns the number of directories now watched; it is an error if none
    /// could be registered.
    pub fn register_all<I, P>(&mut self, directories: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for dir in directories {
            let dir = dir.as_ref();
            match self.add_directory(dir) {
                Ok(_) => {}
                Err(WatcherError::AlreadyWatching(_)) => {
                    debug!("Directory already monitored: {}", dir.display());
                }
                Err(e) => warn!("Skipping {}: {e}", dir.display()),
            }
        }

        if self.watches.is_empty() {
            return Err(WatcherError::NoDirectories);
        }
        Ok(self.watches.len())
    }

    /// Directories currently watched, sorted.
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.watches.values().cloned().collect();
        dirs.sort();
        dirs
    }

    /// Lifetime counters.
    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Run until `shutdown` resolves or the notification source fails.
    ///
    /// Every held watch is released before this returns, whichever way the
    /// loop ends.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<MonitorStats>
    where
        F: Future<Output = ()>,
    {
        if self.watches.is_empty() {
            return Err(WatcherError::NoDirectories);
        }

        info!("Starting monitoring of {} directories", self.watches.len());
        let result = self.read_loop(shutdown).await;
        self.release_all();

        match result {
            Ok(()) => {
                info!("Monitoring stopped");
                Ok(self.stats)
            }
            Err(e) => {
                error!("Error during monitoring: {e}");
                Err(e)
            }
        }
    }

    async fn read_loop<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                biased;
                () = &mut shutdown => None,
                raw = self.backend.read_next() => Some(raw),
            };

            match next {
                None => return Ok(()),
                Some(raw) => self.handle(raw?)?,
            }
        }
    }

    fn handle(&mut self, raw: RawEvent) -> Result<()> {
        match raw.kind {
            RawEventKind::Change(event_type) => {
                let Some(dir) = raw.handle.and_then(|h| self.watches.get(&h)) else {
                    debug!("Ignoring event for unknown watch: {:?}", raw.handle);
                    return Ok(());
                };

                let filename = raw
                    .name
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let record = EventRecord::observe(dir, filename, event_type);
                self.dispatch(&record);
            }
            RawEventKind::WatchRemoved => {
                let Some(dir) = raw.handle.and_then(|h| self.watches.remove(&h)) else {
                    return Ok(());
                };

                self.stats.released += 1;
                warn!("Watch removed by the system: {}", dir.display());
                if self.watches.is_empty() {
                    return Err(WatcherError::AllWatchesLost);
                }
            }
            RawEventKind::Overflow => {
                warn!("Event queue overflowed; some events were lost");
            }
            RawEventKind::Other => {
                debug!("Ignoring unrecognized event on {:?}", raw.handle);
            }
        }

        Ok(())
    }

    fn dispatch(&mut self, record: &EventRecord) {
        debug!(
            "{} {} ({} bytes)",
            record.event_type,
            record.full_path(),
            record.size
        );

        for sink in &mut self.sinks {
            if let Err(e) = sink.accept(record) {
                self.stats.sink_errors += 1;
                warn!("Sink {} failed to write event: {e}", sink.name());
            }
        }
        self.stats.events += 1;
    }

    fn release_all(&mut self) {
        for (handle, dir) in self.watches.drain() {
            match self.backend.release(handle) {
                Ok(()) => self.stats.released += 1,
                Err(e) => warn!("Error releasing watch for {}: {e}", dir.display()),
            }
        }
    }
}

impl<B: WatchBackend> Drop for Monitor<B> {
    fn drop(&mut self) {
        if !self.watches.is_empty() {
            self.release_all();
        }
    }
}

//! Output sinks for event records.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::Result;
use crate::event::EventRecord;

/// Anything that accepts event records.
pub trait EventSink {
    /// Name used in warnings.
    fn name(&self) -> &str;

    /// Record one event.
    fn accept(&mut self, record: &EventRecord) -> Result<()>;
}

/// Writes records to the console (or any writer).
///
/// Non-verbose mode prints one summary line per record; verbose mode prints
/// the whole record as pretty JSON.
pub struct ConsoleSink<W: Write> {
    writer: W,
    verbose: bool,
}

impl ConsoleSink<io::Stdout> {
    /// Console sink on standard output.
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Console sink on an arbitrary writer.
    pub fn new(writer: W, verbose: bool) -> Self {
        Self { writer, verbose }
    }

    /// Consume the sink and return its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for ConsoleSink<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn accept(&mut self, record: &EventRecord) -> Result<()> {
        if self.verbose {
            let json = serde_json::to_string_pretty(record)?;
            writeln!(self.writer, "LOG EVENT: {json}")?;
        } else {
            writeln!(self.writer, "{}", record.summary())?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Appends records to a file, one JSON document per event.
///
/// The file is a concatenation of independent records rather than a single
/// JSON value; use [`read_records`] to parse it back.
pub struct FileSink {
    path: PathBuf,
    file: File,
    name: String,
}

impl FileSink {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened event output file: {}", path.display());

        Ok(Self {
            name: format!("file:{}", path.display()),
            path,
            file,
        })
    }

    /// Path of the output file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept(&mut self, record: &EventRecord) -> Result<()> {
        let mut json = serde_json::to_string_pretty(record)?;
        json.push('\n');
        self.file.write_all(json.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Keeps records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records so far.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn accept(&mut self, record: &EventRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// Read back every record written by a [`FileSink`].
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<EventRecord>> {
    let reader = BufReader::new(File::open(path.as_ref())?);

    serde_json::Deserializer::from_reader(reader)
        .into_iter::<EventRecord>()
        .map(|record| record.map_err(Into::into))
        .collect()
}

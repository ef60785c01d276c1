//! Record source interfaces.
//!
//! Ownership model:
//! - `RecordSource` is the pass-facing interface; every pass asks it for a
//!   fresh `RecordStream` and drops the stream (and its file handle) when the
//!   pass ends.
//! - `XmlFileSource` streams an on-disk XML dump through `XmlScanner`.
//! - `InMemorySource` replays prebuilt records for tests and small datasets.

use std::path::PathBuf;

use crate::data::Record;
use crate::errors::PipelineError;
use crate::transport::fs::FileStream;
use crate::types::SourceId;

/// Streaming XML scanner.
pub mod xml;

pub use xml::XmlScanner;

/// Lazy sequence of scanned records; iteration stops after the first error.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record, PipelineError>> + 'a>;

/// Pass-facing source interface.
///
/// Each `scan` call starts from the beginning of the source and yields the
/// records whose element tag has the local name `tag`, in encounter order.
pub trait RecordSource {
    /// Stable identifier used in errors and logs.
    fn id(&self) -> &str;
    /// Open a new stream over the records tagged `tag`.
    fn scan(&self, tag: &str) -> Result<RecordStream<'_>, PipelineError>;
}

/// XML dump on the local filesystem.
#[derive(Clone, Debug)]
pub struct XmlFileSource {
    stream: FileStream,
    capture_child_text: bool,
}

impl XmlFileSource {
    /// Source reading `path`, identified as `source_id`.
    pub fn new(source_id: impl Into<SourceId>, path: impl Into<PathBuf>) -> Self {
        Self {
            stream: FileStream::new(source_id, path),
            capture_child_text: false,
        }
    }

    /// Source identified by its own path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(path.display().to_string(), path)
    }

    /// Also copy direct child element text into each record.
    pub fn with_child_text(mut self, capture: bool) -> Self {
        self.capture_child_text = capture;
        self
    }

    /// Best-effort size of the backing file.
    pub fn size_hint(&self) -> Option<u64> {
        self.stream.size_hint()
    }
}

impl RecordSource for XmlFileSource {
    fn id(&self) -> &str {
        self.stream.source_id()
    }

    fn scan(&self, tag: &str) -> Result<RecordStream<'_>, PipelineError> {
        let reader = self.stream.open()?;
        let scanner = XmlScanner::new(reader, self.stream.source_id(), tag)
            .with_child_text(self.capture_child_text);
        Ok(Box::new(scanner))
    }
}

/// In-memory source for tests and small datasets.
///
/// Records are already split, so the tag passed to `scan` is ignored.
#[derive(Clone, Debug)]
pub struct InMemorySource {
    id: SourceId,
    records: Vec<Record>,
}

impl InMemorySource {
    /// Create an in-memory source from prebuilt records.
    pub fn new(id: impl Into<SourceId>, records: Vec<Record>) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }
}

impl RecordSource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn scan(&self, _tag: &str) -> Result<RecordStream<'_>, PipelineError> {
        Ok(Box::new(self.records.iter().cloned().map(Ok)))
    }
}

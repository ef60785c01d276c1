use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::PipelineError;
use crate::types::SourceId;

/// Read buffer used for source files; dumps are read strictly front to back.
const READ_BUFFER_BYTES: usize = 256 * 1024;

/// Filesystem transport for one source file.
#[derive(Clone, Debug)]
pub struct FileStream {
    source_id: SourceId,
    path: PathBuf,
}

impl FileStream {
    /// Stream over `path`, reported as `source_id` in errors and logs.
    pub fn new(source_id: impl Into<SourceId>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
        }
    }

    /// Source identifier.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a buffered reader positioned at the start of the file.
    ///
    /// Any open failure is reported as `SourceNotFound`.
    pub fn open(&self) -> Result<BufReader<File>, PipelineError> {
        let file = File::open(&self.path).map_err(|err| PipelineError::SourceNotFound {
            source_id: self.source_id.clone(),
            path: self.path.display().to_string(),
            reason: err.to_string(),
        })?;
        Ok(BufReader::with_capacity(READ_BUFFER_BYTES, file))
    }

    /// Best-effort file size for progress logs.
    pub fn size_hint(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|meta| meta.len())
    }
}

use std::io;

use thiserror::Error;

use crate::types::{RecordTag, SourceId};

/// Error type for argument, source, parse, and output failures.
///
/// Duplicate keys after the join are not represented here; they surface as an
/// [`IntegrityReport`](crate::join::IntegrityReport) next to the finished table.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("usage error: {0}")]
    Usage(String),
    #[error("source '{source_id}' not found at {path}: {reason}")]
    SourceNotFound {
        source_id: SourceId,
        path: String,
        reason: String,
    },
    #[error("source '{source_id}' is malformed at byte {position}: {reason}")]
    MalformedSource {
        source_id: SourceId,
        position: u64,
        reason: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("no records with tag '{tag}' found to process")]
    NoMatchingRecords { tag: RecordTag },
    #[error("failed writing output table: {0}")]
    Output(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl PipelineError {
    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Usage(_) | PipelineError::Configuration(_) => 2,
            PipelineError::SourceNotFound { .. } => 3,
            PipelineError::MalformedSource { .. } => 4,
            _ => 1,
        }
    }
}

impl From<parquet::errors::ParquetError> for PipelineError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        PipelineError::Output(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Output(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_error_classes() {
        let usage = PipelineError::Usage("bad".into());
        let missing = PipelineError::SourceNotFound {
            source_id: "posts".into(),
            path: "Posts.xml".into(),
            reason: "gone".into(),
        };
        let malformed = PipelineError::MalformedSource {
            source_id: "posts".into(),
            position: 12,
            reason: "unexpected eof".into(),
        };
        let other = PipelineError::Runtime("boom".into());
        let codes = [
            usage.exit_code(),
            missing.exit_code(),
            malformed.exit_code(),
            other.exit_code(),
        ];
        assert!(codes.iter().all(|code| *code != 0));
        assert_eq!(codes, [2, 3, 4, 1]);
    }

    #[test]
    fn messages_name_the_failing_source() {
        let err = PipelineError::MalformedSource {
            source_id: "comments".into(),
            position: 40,
            reason: "mismatched end tag".into(),
        };
        let text = err.to_string();
        assert!(text.contains("comments"));
        assert!(text.contains("40"));
    }
}

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners behind the `sample_join` and `xml_to_table` binaries.
pub mod apps;
/// Pass, join, and pipeline configuration types.
pub mod config;
/// Centralized field names and defaults.
pub mod constants;
/// Bounded XML-to-table conversion.
pub mod convert;
/// Field values, records, and key sets.
pub mod data;
/// Key-filtered extraction passes.
pub mod extract;
/// Denormalizing join and integrity reporting.
pub mod join;
/// Per-pass counters and group-size summaries.
pub mod metrics;
/// Table sinks.
pub mod output;
/// Four-pass orchestration.
pub mod pipeline;
/// Reservoir sampling of the primary source.
pub mod sampler;
/// Record source trait and built-in sources.
pub mod source;
/// Output table model.
pub mod table;
/// Input transports used by sources.
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::{
    ColumnSource, ColumnSpec, DenormalizeConfig, DuplicatePolicy, ExtractConfig, ExtractMode,
    PipelineConfig, PrimaryFilter, SamplerConfig,
};
pub use convert::TableConverter;
pub use data::{FieldValue, KeySet, Record};
pub use errors::PipelineError;
pub use extract::{Extraction, KeyFilteredExtractor, Matches};
pub use join::{Denormalized, DenormalizedRow, Denormalizer, IntegrityReport, JoinInputs};
pub use metrics::PassStats;
pub use output::{ParquetTableWriter, TableWriter};
pub use pipeline::{PipelineOutput, PipelineSources, SamplePipeline};
pub use sampler::{PrimarySample, ReservoirSampler};
pub use source::{InMemorySource, RecordSource, XmlFileSource, XmlScanner};
pub use table::{ColumnKind, Table, TableColumn};
pub use types::{CanonicalKey, FieldName, LogMessage, RecordTag, SourceId};

use std::path::PathBuf;

use crate::constants::cli::DEFAULT_OUTPUT_FILE;
use crate::constants::fields::{
    ID, OWNER_USER_ID, POST_ID, POST_TYPE_ID, QUESTION_POST_TYPE, USER_ID,
};
use crate::constants::join::{
    CHILD_COUNT_FIELD, CHILDREN_FIELD, DEFAULT_PRIMARY_COLUMNS, DEFAULT_REFERENCE_COLUMNS,
    FLAT_COUNT_FIELD, PRIMARY_SUFFIX, REFERENCE_SUFFIX,
};
use crate::constants::scan::DEFAULT_RECORD_TAG;
use crate::data::Record;
use crate::types::{FieldName, RecordTag};

/// Predicate deciding which primary records take part in sampling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrimaryFilter {
    /// Every scanned record qualifies.
    All,
    /// Qualifies when the raw attribute equals `value` exactly.
    FieldEquals { field: FieldName, value: String },
}

impl PrimaryFilter {
    /// Apply the predicate to a scanned record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            PrimaryFilter::All => true,
            PrimaryFilter::FieldEquals { field, value } => record
                .get(field)
                .is_some_and(|found| found.to_string() == *value),
        }
    }
}

impl Default for PrimaryFilter {
    fn default() -> Self {
        PrimaryFilter::FieldEquals {
            field: POST_TYPE_ID.to_string(),
            value: QUESTION_POST_TYPE.to_string(),
        }
    }
}

/// Reservoir sampling pass configuration.
#[derive(Clone, Debug)]
pub struct SamplerConfig {
    /// Requested sample size `k`; must be positive.
    pub sample_size: usize,
    /// RNG seed for reproducible draws; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Primary key field, canonicalized for every sampled record.
    pub key_field: FieldName,
    /// Optional owner foreign-key field collected from the final sample.
    pub owner_field: FieldName,
    /// Predicate selecting qualifying records.
    pub filter: PrimaryFilter,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_size: 100,
            seed: None,
            key_field: ID.to_string(),
            owner_field: OWNER_USER_ID.to_string(),
            filter: PrimaryFilter::default(),
        }
    }
}

/// How an extraction pass returns its matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractMode {
    /// One ordered sequence in encounter order.
    Flat,
    /// Ordered buckets keyed by the filter key.
    Grouped,
}

/// Key-filtered extraction pass configuration.
#[derive(Clone, Debug)]
pub struct ExtractConfig {
    /// Field whose canonical key must be in the filter set.
    pub key_field: FieldName,
    /// Retrieval mode.
    pub mode: ExtractMode,
    /// Additional foreign-key fields collected from the matches.
    pub collect_fields: Vec<FieldName>,
}

impl ExtractConfig {
    /// Flat extraction on `key_field`, collecting nothing extra.
    pub fn flat(key_field: impl Into<FieldName>) -> Self {
        Self {
            key_field: key_field.into(),
            mode: ExtractMode::Flat,
            collect_fields: Vec::new(),
        }
    }

    /// Grouped extraction on `key_field`, collecting nothing extra.
    pub fn grouped(key_field: impl Into<FieldName>) -> Self {
        Self {
            key_field: key_field.into(),
            mode: ExtractMode::Grouped,
            collect_fields: Vec::new(),
        }
    }

    /// Also collect canonical keys from `field` of every match.
    pub fn collecting(mut self, field: impl Into<FieldName>) -> Self {
        self.collect_fields.push(field.into());
        self
    }
}

/// What to do when the primary key column is not unique after joining.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Keep every row and report the duplicated keys.
    #[default]
    Warn,
    /// Keep the first row per key and report what was dropped.
    Deduplicate,
}

/// Where a projected output column takes its value from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnSource {
    /// A field of the sampled primary record.
    Primary(FieldName),
    /// A field of the left-joined reference record.
    Reference(FieldName),
    /// The grouped children, serialized as a JSON array.
    Children,
    /// Number of grouped children.
    ChildCount,
    /// Aggregated count of flat children.
    FlatCount,
}

/// One column of the fixed output projection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Output column name.
    pub name: FieldName,
    /// Value origin.
    pub source: ColumnSource,
}

impl ColumnSpec {
    /// Column named `name` reading from `source`.
    pub fn new(name: impl Into<FieldName>, source: ColumnSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// Projection used when no explicit column list is configured.
pub fn default_columns() -> Vec<ColumnSpec> {
    let mut columns = Vec::new();
    for field in DEFAULT_PRIMARY_COLUMNS {
        columns.push(ColumnSpec::new(
            format!("{field}{PRIMARY_SUFFIX}"),
            ColumnSource::Primary(field.to_string()),
        ));
    }
    for field in DEFAULT_REFERENCE_COLUMNS {
        columns.push(ColumnSpec::new(
            format!("{field}{REFERENCE_SUFFIX}"),
            ColumnSource::Reference(field.to_string()),
        ));
    }
    columns.push(ColumnSpec::new(CHILDREN_FIELD, ColumnSource::Children));
    columns.push(ColumnSpec::new(CHILD_COUNT_FIELD, ColumnSource::ChildCount));
    columns.push(ColumnSpec::new(FLAT_COUNT_FIELD, ColumnSource::FlatCount));
    columns
}

/// Denormalizer configuration.
#[derive(Clone, Debug)]
pub struct DenormalizeConfig {
    /// Primary key field of sampled records.
    pub primary_key_field: FieldName,
    /// Owner foreign key on primary records, joined to `reference_key_field`.
    pub owner_field: FieldName,
    /// Key field of reference records.
    pub reference_key_field: FieldName,
    /// Foreign key of flat child records, aggregated per primary key.
    pub flat_key_field: FieldName,
    /// Fixed output projection.
    pub columns: Vec<ColumnSpec>,
    /// Post-join duplicate handling.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for DenormalizeConfig {
    fn default() -> Self {
        Self {
            primary_key_field: ID.to_string(),
            owner_field: OWNER_USER_ID.to_string(),
            reference_key_field: ID.to_string(),
            flat_key_field: POST_ID.to_string(),
            columns: default_columns(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

/// Full four-pass run configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Local element name of one record in every source.
    pub record_tag: RecordTag,
    /// Pass 1 over the primary source.
    pub sampler: SamplerConfig,
    /// Pass 2 over the grouped-children source.
    pub grouped: ExtractConfig,
    /// Pass 3 over the flat-children source.
    pub flat: ExtractConfig,
    /// Pass 4 over the reference source.
    pub reference: ExtractConfig,
    /// Final join and projection.
    pub denormalize: DenormalizeConfig,
    /// Destination of the combined table.
    pub output_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            record_tag: DEFAULT_RECORD_TAG.to_string(),
            sampler: SamplerConfig::default(),
            grouped: ExtractConfig::grouped(POST_ID).collecting(USER_ID),
            flat: ExtractConfig::flat(POST_ID),
            reference: ExtractConfig::flat(ID),
            denormalize: DenormalizeConfig::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
        }
    }
}

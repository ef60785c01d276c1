//! Key-filtered extraction over secondary sources.
//!
//! One extractor serves every secondary source; only the key field, the
//! frozen key set and the retrieval mode change between passes. A record
//! whose key field is absent or not a base-10 integer is a non-match and is
//! skipped without error.

use indexmap::IndexMap;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::{ExtractConfig, ExtractMode};
use crate::constants::scan::PROGRESS_EVERY;
use crate::data::{KeySet, Record};
use crate::errors::PipelineError;
use crate::metrics::{PassStats, group_size_summary};
use crate::source::RecordSource;
use crate::types::CanonicalKey;

/// Matches of one extraction pass.
#[derive(Clone, Debug, PartialEq)]
pub enum Matches {
    /// All matches in encounter order.
    Flat(Vec<Record>),
    /// Matches bucketed by key; buckets appear in first-encounter order and
    /// keep encounter order internally.
    Grouped(IndexMap<CanonicalKey, Vec<Record>>),
}

/// Output of one extraction pass.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub matches: Matches,
    /// Canonical keys collected from the configured extra fields of matches.
    pub collected: KeySet,
    pub stats: PassStats,
}

impl Extraction {
    /// Total number of matched records.
    pub fn len(&self) -> usize {
        match &self.matches {
            Matches::Flat(records) => records.len(),
            Matches::Grouped(groups) => groups.values().map(Vec::len).sum(),
        }
    }

    /// True when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matches as one sequence. Grouped output is concatenated bucket by bucket.
    pub fn into_flat(self) -> Vec<Record> {
        match self.matches {
            Matches::Flat(records) => records,
            Matches::Grouped(groups) => groups.into_values().flatten().collect(),
        }
    }

    /// Matches bucketed by `key_field`.
    pub fn into_groups(self, key_field: &str) -> IndexMap<CanonicalKey, Vec<Record>> {
        match self.matches {
            Matches::Grouped(groups) => groups,
            Matches::Flat(records) => group_by_key(records, key_field),
        }
    }
}

/// Bucket canonicalized records by `key_field`, keeping encounter order.
pub fn group_by_key(records: Vec<Record>, key_field: &str) -> IndexMap<CanonicalKey, Vec<Record>> {
    let mut groups: IndexMap<CanonicalKey, Vec<Record>> = IndexMap::new();
    for record in records {
        if let Some(key) = record.key(key_field) {
            groups.entry(key).or_default().push(record);
        }
    }
    groups
}

/// Extractor that keeps records whose key field is in a frozen key set.
#[derive(Clone, Debug)]
pub struct KeyFilteredExtractor {
    config: ExtractConfig,
}

impl KeyFilteredExtractor {
    /// Build an extractor for `config`.
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Scan `source` and keep the records keyed into `keys`.
    pub fn run(
        &self,
        source: &dyn RecordSource,
        tag: &str,
        keys: &KeySet,
    ) -> Result<Extraction, PipelineError> {
        let records = source.scan(tag)?;
        self.extract(source.id(), records, keys)
    }

    /// Filter an arbitrary record stream.
    pub fn extract<I>(
        &self,
        source_id: &str,
        records: I,
        keys: &KeySet,
    ) -> Result<Extraction, PipelineError>
    where
        I: IntoIterator<Item = Result<Record, PipelineError>>,
    {
        let started = Instant::now();
        let key_field = self.config.key_field.as_str();
        let mut flat = Vec::new();
        let mut groups: IndexMap<CanonicalKey, Vec<Record>> = IndexMap::new();
        let mut collected = KeySet::new();
        let mut scanned = 0u64;
        let mut matched = 0u64;

        info!(
            source = source_id,
            field = key_field,
            keys = keys.len(),
            mode = ?self.config.mode,
            "extracting keyed records"
        );
        for record in records {
            let mut record = record?;
            scanned += 1;
            if scanned % PROGRESS_EVERY == 0 {
                debug!(source = source_id, scanned, matched, "extraction progress");
            }
            let Some(key) = record.key(key_field) else {
                continue;
            };
            if !keys.contains(key) {
                continue;
            }
            record.canonicalize(key_field);
            for field in &self.config.collect_fields {
                if let Some(extra) = record.canonicalize(field) {
                    collected.insert(extra);
                }
            }
            matched += 1;
            match self.config.mode {
                ExtractMode::Flat => flat.push(record),
                ExtractMode::Grouped => groups.entry(key).or_default().push(record),
            }
        }

        let matches = match self.config.mode {
            ExtractMode::Flat => Matches::Flat(flat),
            ExtractMode::Grouped => {
                if let Some(summary) = group_size_summary(&groups) {
                    debug!(
                        source = source_id,
                        groups = summary.groups,
                        total = summary.total,
                        min = summary.min,
                        max = summary.max,
                        largest_key = summary.largest_key,
                        mean = summary.mean,
                        "group sizes"
                    );
                }
                Matches::Grouped(groups)
            }
        };
        let stats = PassStats {
            source: source_id.to_string(),
            scanned,
            matched,
            elapsed: started.elapsed(),
        };
        info!(
            source = source_id,
            scanned,
            matched,
            collected = collected.len(),
            ratio = stats.match_ratio(),
            "extraction pass complete"
        );
        Ok(Extraction {
            matches,
            collected,
            stats,
        })
    }
}

//! Single-pass uniform sampling of primary records (Algorithm R).
//!
//! The reservoir holds at most `k` records. The `i`-th qualifying record
//! (1-indexed) is appended while `i <= k`; afterwards a slot `j` is drawn
//! uniformly from `[0, i-1]` and the record replaces `S[j]` when `j < k`.
//! At the end of the pass every qualifying record has been kept with
//! probability `min(1, k / n)`, independent of arrival order.
//!
//! Key sets are derived from the *final* reservoir only, because earlier
//! occupants of a slot may have been displaced.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SamplerConfig;
use crate::constants::scan::PROGRESS_EVERY;
use crate::data::{KeySet, Record};
use crate::errors::PipelineError;
use crate::metrics::PassStats;
use crate::source::RecordSource;

/// Output of the sampling pass.
#[derive(Clone, Debug)]
pub struct PrimarySample {
    /// Sampled records with primary and owner keys canonicalized.
    pub records: Vec<Record>,
    /// Primary keys of the sampled records. Frozen once the pass returns.
    pub primary_keys: KeySet,
    /// Owner foreign keys referenced by the sampled records.
    pub owner_keys: KeySet,
    /// Number of qualifying records seen (`n`).
    pub qualifying: u64,
    /// Records that matched the filter but had no parseable primary key.
    pub unkeyed: u64,
    pub stats: PassStats,
}

impl PrimarySample {
    /// Number of sampled records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing qualified.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reservoir sampler over one primary source.
#[derive(Clone, Debug)]
pub struct ReservoirSampler {
    config: SamplerConfig,
}

impl ReservoirSampler {
    /// Validate `config` and build a sampler. Fails when `sample_size == 0`.
    pub fn new(config: SamplerConfig) -> Result<Self, PipelineError> {
        if config.sample_size == 0 {
            return Err(PipelineError::Configuration(
                "sample size must be a positive integer".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample `source`, seeding the RNG from the config (or the OS when unset).
    pub fn run(&self, source: &dyn RecordSource, tag: &str) -> Result<PrimarySample, PipelineError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let records = source.scan(tag)?;
        self.sample(source.id(), records, &mut rng)
    }

    /// Sample an arbitrary record stream with a caller-supplied RNG.
    pub fn sample<I, R>(
        &self,
        source_id: &str,
        records: I,
        rng: &mut R,
    ) -> Result<PrimarySample, PipelineError>
    where
        I: IntoIterator<Item = Result<Record, PipelineError>>,
        R: Rng,
    {
        let started = Instant::now();
        let k = self.config.sample_size;
        let mut reservoir: Vec<Record> = Vec::new();
        let mut scanned = 0u64;
        let mut qualifying = 0u64;
        let mut unkeyed = 0u64;

        info!(source = source_id, sample_size = k, "sampling primary records");
        for record in records {
            let record = record?;
            scanned += 1;
            if scanned % PROGRESS_EVERY == 0 {
                debug!(source = source_id, scanned, qualifying, "sampling progress");
            }
            if !self.config.filter.matches(&record) {
                continue;
            }
            if record.key(&self.config.key_field).is_none() {
                unkeyed += 1;
                continue;
            }
            qualifying += 1;
            if qualifying <= k as u64 {
                reservoir.push(record);
            } else {
                let slot = rng.random_range(0..qualifying);
                if slot < k as u64 {
                    reservoir[slot as usize] = record;
                }
            }
        }

        if unkeyed > 0 {
            warn!(
                source = source_id,
                unkeyed,
                field = %self.config.key_field,
                "skipped qualifying records without a numeric primary key"
            );
        }

        let mut primary_keys = KeySet::new();
        let mut owner_keys = KeySet::new();
        for record in &mut reservoir {
            if let Some(key) = record.canonicalize(&self.config.key_field) {
                primary_keys.insert(key);
            }
            if let Some(owner) = record.canonicalize(&self.config.owner_field) {
                owner_keys.insert(owner);
            }
        }

        let stats = PassStats {
            source: source_id.to_string(),
            scanned,
            matched: qualifying,
            elapsed: started.elapsed(),
        };
        info!(
            source = source_id,
            scanned,
            qualifying,
            sampled = reservoir.len(),
            owners = owner_keys.len(),
            ratio = stats.match_ratio(),
            "sampling pass complete"
        );
        Ok(PrimarySample {
            records: reservoir,
            primary_keys,
            owner_keys,
            qualifying,
            unkeyed,
            stats,
        })
    }
}

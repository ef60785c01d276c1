//! Four-pass sample-and-join orchestration.
//!
//! Passes run strictly in order and each one is a function of its source and
//! the frozen key sets produced before it:
//!
//! 1. sample the primary source → sample, primary keys, owner keys
//! 2. grouped extraction keyed by primary keys → children, child-owner keys
//! 3. flat extraction keyed by primary keys → flat children
//! 4. reference extraction keyed by owner ∪ child-owner keys → references
//!
//! The denormalizer then consumes all four outputs. State is threaded through
//! local values only; nothing is shared between passes.

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::extract::KeyFilteredExtractor;
use crate::join::{Denormalizer, IntegrityReport, JoinInputs};
use crate::metrics::PassStats;
use crate::output::TableWriter;
use crate::sampler::ReservoirSampler;
use crate::source::RecordSource;
use crate::table::Table;

/// The four sources of one run.
pub struct PipelineSources<'a> {
    /// Sampled source (posts).
    pub primary: &'a dyn RecordSource,
    /// Grouped children (comments).
    pub grouped: &'a dyn RecordSource,
    /// Flat children aggregated to counts (votes).
    pub flat: &'a dyn RecordSource,
    /// Reference records joined through owner keys (users).
    pub reference: &'a dyn RecordSource,
}

/// Result of a complete run.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub table: Table,
    pub integrity: IntegrityReport,
    /// Qualifying primary records seen during sampling.
    pub qualifying: u64,
    /// Records kept by the sampler.
    pub sampled: usize,
    /// Per-pass counters in pass order.
    pub passes: Vec<PassStats>,
}

/// Configured sample-and-join run.
#[derive(Clone, Debug)]
pub struct SamplePipeline {
    config: PipelineConfig,
    sampler: ReservoirSampler,
    denormalizer: Denormalizer,
}

impl SamplePipeline {
    /// Validate `config` before any source is opened.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let sampler = ReservoirSampler::new(config.sampler.clone())?;
        let denormalizer = Denormalizer::new(config.denormalize.clone())?;
        Ok(Self {
            config,
            sampler,
            denormalizer,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all passes and build the table.
    pub fn run(&self, sources: &PipelineSources<'_>) -> Result<PipelineOutput, PipelineError> {
        let tag = self.config.record_tag.as_str();

        let sample = self.sampler.run(sources.primary, tag)?;
        if sample.is_empty() {
            warn!(source = sources.primary.id(), "no qualifying primary records");
        }

        let grouped = KeyFilteredExtractor::new(self.config.grouped.clone()).run(
            sources.grouped,
            tag,
            &sample.primary_keys,
        )?;
        let flat = KeyFilteredExtractor::new(self.config.flat.clone()).run(
            sources.flat,
            tag,
            &sample.primary_keys,
        )?;

        let reference_keys = sample.owner_keys.union(&grouped.collected);
        let references = KeyFilteredExtractor::new(self.config.reference.clone()).run(
            sources.reference,
            tag,
            &reference_keys,
        )?;

        let passes = vec![
            sample.stats.clone(),
            grouped.stats.clone(),
            flat.stats.clone(),
            references.stats.clone(),
        ];
        let qualifying = sample.qualifying;
        let sampled = sample.len();

        let inputs = JoinInputs {
            sample: sample.records,
            children: grouped.into_groups(&self.config.grouped.key_field),
            flat: flat.into_flat(),
            references: references.into_flat(),
        };
        let denormalized = self.denormalizer.denormalize(inputs)?;
        Ok(PipelineOutput {
            table: denormalized.table,
            integrity: denormalized.integrity,
            qualifying,
            sampled,
            passes,
        })
    }

    /// Run all passes and hand the table to `writer`.
    pub fn run_to(
        &self,
        sources: &PipelineSources<'_>,
        writer: &dyn TableWriter,
    ) -> Result<PipelineOutput, PipelineError> {
        let output = self.run(sources)?;
        writer.write(&output.table)?;
        info!(
            rows = output.table.len(),
            clean = output.integrity.is_clean(),
            "sample-and-join run complete"
        );
        Ok(output)
    }
}

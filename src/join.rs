//! Denormalizing join of the sample with everything extracted for it.
//!
//! Joins are explicit hash lookups from canonical key to records:
//! - grouped children attach to their primary row as an ordered sequence
//!   (empty, never absent, when nothing matched);
//! - flat children are aggregated to a count per key and left-joined, with
//!   zero as the identity for unmatched rows;
//! - reference records are left-joined through the owner key, leaving
//!   reference columns null when the owner is missing or unknown.
//!
//! A reference key that occurs more than once fans out into several rows for
//! the same primary key. That, and any duplicate in the sample itself, is
//! caught by the post-join uniqueness check and reported in an
//! [`IntegrityReport`] instead of being merged silently.

use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::{ColumnSource, DenormalizeConfig, DuplicatePolicy};
use crate::data::{FieldValue, Record};
use crate::errors::PipelineError;
use crate::table::{Table, TableColumn};
use crate::types::{CanonicalKey, LogMessage};

/// Everything the denormalizer consumes, one field per pass.
#[derive(Clone, Debug, Default)]
pub struct JoinInputs {
    /// Pass 1: sampled primary records.
    pub sample: Vec<Record>,
    /// Pass 2: grouped children keyed by primary key.
    pub children: IndexMap<CanonicalKey, Vec<Record>>,
    /// Pass 3: flat children.
    pub flat: Vec<Record>,
    /// Pass 4: reference records.
    pub references: Vec<Record>,
}

/// One joined row before projection.
#[derive(Clone, Debug, PartialEq)]
pub struct DenormalizedRow {
    pub primary_key: CanonicalKey,
    pub primary: Record,
    /// Left-joined reference record, if the owner key matched one.
    pub reference: Option<Record>,
    /// Grouped children in source encounter order.
    pub children: Vec<Record>,
    /// Number of flat children referencing this row's key.
    pub flat_count: u64,
}

impl DenormalizedRow {
    /// Derived count of grouped children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// A primary key that appears on more than one joined row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateKey {
    pub key: CanonicalKey,
    pub occurrences: usize,
}

/// Result of the post-join uniqueness check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Duplicated keys in first-appearance order.
    pub duplicates: Vec<DuplicateKey>,
    pub policy: DuplicatePolicy,
    /// Rows removed under `DuplicatePolicy::Deduplicate`.
    pub dropped_rows: usize,
    /// Sampled records skipped because their primary key was not numeric.
    pub unkeyed_rows: usize,
}

impl IntegrityReport {
    /// True when the primary key column was unique.
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty()
    }

    /// The duplicated keys.
    pub fn duplicated_keys(&self) -> Vec<CanonicalKey> {
        self.duplicates.iter().map(|dup| dup.key).collect()
    }

    /// Human-readable warning, or `None` when the check passed.
    pub fn warning(&self) -> Option<LogMessage> {
        if self.is_clean() {
            return None;
        }
        let mut message = format!(
            "{} primary key(s) occur on more than one row: {:?}",
            self.duplicates.len(),
            self.duplicated_keys()
        );
        if self.dropped_rows > 0 {
            message.push_str(&format!("; {} duplicate row(s) dropped", self.dropped_rows));
        }
        Some(message)
    }
}

/// Joined rows, their projection, and the integrity finding.
#[derive(Clone, Debug)]
pub struct Denormalized {
    pub rows: Vec<DenormalizedRow>,
    pub table: Table,
    pub integrity: IntegrityReport,
}

/// Builds the final table from the outputs of the four passes.
#[derive(Clone, Debug)]
pub struct Denormalizer {
    config: DenormalizeConfig,
}

impl Denormalizer {
    /// Validate the projection and build a denormalizer.
    pub fn new(config: DenormalizeConfig) -> Result<Self, PipelineError> {
        if config.columns.is_empty() {
            return Err(PipelineError::Configuration(
                "output column list must not be empty".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for column in &config.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(PipelineError::Configuration(format!(
                    "output column '{}' is listed more than once",
                    column.name
                )));
            }
        }
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &DenormalizeConfig {
        &self.config
    }

    /// Join, check, and project.
    pub fn denormalize(&self, inputs: JoinInputs) -> Result<Denormalized, PipelineError> {
        let (rows, integrity) = self.join_rows(inputs);
        let table = self.project(&rows)?;
        info!(
            rows = table.len(),
            columns = table.columns().len(),
            duplicates = integrity.duplicates.len(),
            "denormalized sample"
        );
        Ok(Denormalized {
            rows,
            table,
            integrity,
        })
    }

    /// Left-join everything onto the sample and run the uniqueness check.
    pub fn join_rows(&self, inputs: JoinInputs) -> (Vec<DenormalizedRow>, IntegrityReport) {
        let JoinInputs {
            sample,
            children,
            flat,
            references,
        } = inputs;
        let config = &self.config;

        let mut flat_counts: HashMap<CanonicalKey, u64> = HashMap::new();
        for record in &flat {
            if let Some(key) = record.key(&config.flat_key_field) {
                *flat_counts.entry(key).or_insert(0) += 1;
            }
        }

        let mut reference_index: HashMap<CanonicalKey, Vec<Record>> = HashMap::new();
        for record in references {
            if let Some(key) = record.key(&config.reference_key_field) {
                reference_index.entry(key).or_default().push(record);
            }
        }

        let mut rows = Vec::with_capacity(sample.len());
        let mut unkeyed_rows = 0usize;
        for primary in sample {
            let Some(primary_key) = primary.key(&config.primary_key_field) else {
                unkeyed_rows += 1;
                continue;
            };
            let attached = children.get(&primary_key).cloned().unwrap_or_default();
            let flat_count = flat_counts.get(&primary_key).copied().unwrap_or(0);
            let matched_refs = primary
                .key(&config.owner_field)
                .and_then(|owner| reference_index.get(&owner))
                .filter(|refs| !refs.is_empty());
            match matched_refs {
                Some(refs) => {
                    for reference in refs {
                        rows.push(DenormalizedRow {
                            primary_key,
                            primary: primary.clone(),
                            reference: Some(reference.clone()),
                            children: attached.clone(),
                            flat_count,
                        });
                    }
                }
                None => rows.push(DenormalizedRow {
                    primary_key,
                    primary,
                    reference: None,
                    children: attached,
                    flat_count,
                }),
            }
        }
        if unkeyed_rows > 0 {
            warn!(
                unkeyed_rows,
                field = %config.primary_key_field,
                "sampled records without a numeric primary key were not joined"
            );
        }

        let mut occurrences: IndexMap<CanonicalKey, usize> = IndexMap::new();
        for row in &rows {
            *occurrences.entry(row.primary_key).or_insert(0) += 1;
        }
        let duplicates: Vec<DuplicateKey> = occurrences
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, occurrences)| DuplicateKey { key, occurrences })
            .collect();

        let mut dropped_rows = 0usize;
        if !duplicates.is_empty() {
            let keys: Vec<CanonicalKey> = duplicates.iter().map(|dup| dup.key).collect();
            warn!(
                ?keys,
                policy = ?config.duplicate_policy,
                "duplicate primary keys after join"
            );
            if config.duplicate_policy == DuplicatePolicy::Deduplicate {
                let before = rows.len();
                let mut kept = std::collections::HashSet::new();
                rows.retain(|row| kept.insert(row.primary_key));
                dropped_rows = before - rows.len();
            }
        }

        let integrity = IntegrityReport {
            duplicates,
            policy: config.duplicate_policy,
            dropped_rows,
            unkeyed_rows,
        };
        (rows, integrity)
    }

    /// Project joined rows onto the configured column list.
    pub fn project(&self, rows: &[DenormalizedRow]) -> Result<Table, PipelineError> {
        let columns = self
            .config
            .columns
            .iter()
            .map(|spec| match spec.source {
                ColumnSource::ChildCount | ColumnSource::FlatCount => {
                    TableColumn::count(spec.name.clone())
                }
                _ => TableColumn::text(spec.name.clone()),
            })
            .collect();
        let mut table = Table::new(columns);
        for row in rows {
            let mut values = Vec::with_capacity(self.config.columns.len());
            for spec in &self.config.columns {
                let value = match &spec.source {
                    ColumnSource::Primary(field) => {
                        row.primary.get(field).cloned().unwrap_or(FieldValue::Null)
                    }
                    ColumnSource::Reference(field) => row
                        .reference
                        .as_ref()
                        .and_then(|reference| reference.get(field))
                        .cloned()
                        .unwrap_or(FieldValue::Null),
                    ColumnSource::Children => {
                        FieldValue::Str(serde_json::to_string(&row.children)?)
                    }
                    ColumnSource::ChildCount => FieldValue::Int(row.child_count() as i64),
                    ColumnSource::FlatCount => FieldValue::Int(row.flat_count as i64),
                };
                values.push(value);
            }
            table.push_row(values);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnSpec;

    fn post(id: i64, owner: Option<i64>) -> Record {
        let mut record = Record::from_pairs([("Id", FieldValue::Int(id))]);
        record.insert("Title", format!("post {id}"));
        if let Some(owner) = owner {
            record.insert("OwnerUserId", owner);
        }
        record
    }

    fn user(id: i64, name: &str) -> Record {
        Record::from_pairs([
            ("Id", FieldValue::Int(id)),
            ("DisplayName", FieldValue::from(name)),
        ])
    }

    fn child(id: i64, post: i64) -> Record {
        Record::from_pairs([("Id", FieldValue::Int(id)), ("PostId", FieldValue::Int(post))])
    }

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("Id_Post", ColumnSource::Primary("Id".into())),
            ColumnSpec::new("Title_Post", ColumnSource::Primary("Title".into())),
            ColumnSpec::new("DisplayName_User", ColumnSource::Reference("DisplayName".into())),
            ColumnSpec::new("Comments", ColumnSource::Children),
            ColumnSpec::new("CommentRecordCount", ColumnSource::ChildCount),
            ColumnSpec::new("VoteRecordCount", ColumnSource::FlatCount),
        ]
    }

    fn denormalizer(policy: DuplicatePolicy) -> Denormalizer {
        Denormalizer::new(DenormalizeConfig {
            columns: columns(),
            duplicate_policy: policy,
            ..DenormalizeConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn joins_children_counts_and_reference() {
        let mut children = IndexMap::new();
        children.insert(5, vec![child(100, 5)]);
        let inputs = JoinInputs {
            sample: vec![post(5, Some(9))],
            children,
            flat: vec![child(200, 5), child(201, 5)],
            references: vec![user(9, "ada")],
        };
        let out = denormalizer(DuplicatePolicy::Warn).denormalize(inputs).unwrap();
        assert!(out.integrity.is_clean());
        assert!(out.integrity.warning().is_none());
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.table.value(0, "Id_Post"), Some(&FieldValue::Int(5)));
        assert_eq!(out.table.value(0, "DisplayName_User"), Some(&FieldValue::from("ada")));
        assert_eq!(out.table.value(0, "CommentRecordCount"), Some(&FieldValue::Int(1)));
        assert_eq!(out.table.value(0, "VoteRecordCount"), Some(&FieldValue::Int(2)));
        assert_eq!(
            out.table.value(0, "Comments"),
            Some(&FieldValue::from(r#"[{"Id":100,"PostId":5}]"#))
        );
    }

    #[test]
    fn unmatched_rows_degrade_to_nulls_and_zero_counts() {
        let inputs = JoinInputs {
            sample: vec![post(5, Some(9)), post(6, None)],
            ..JoinInputs::default()
        };
        let out = denormalizer(DuplicatePolicy::Warn).denormalize(inputs).unwrap();
        assert_eq!(out.table.len(), 2);
        for row in 0..2 {
            assert_eq!(out.table.value(row, "DisplayName_User"), Some(&FieldValue::Null));
            assert_eq!(out.table.value(row, "Comments"), Some(&FieldValue::from("[]")));
            assert_eq!(out.table.value(row, "CommentRecordCount"), Some(&FieldValue::Int(0)));
            assert_eq!(out.table.value(row, "VoteRecordCount"), Some(&FieldValue::Int(0)));
        }
        assert!(out.rows.iter().all(|row| row.children.is_empty()));
    }

    #[test]
    fn duplicate_reference_keys_are_reported_and_kept() {
        let inputs = JoinInputs {
            sample: vec![post(5, Some(9)), post(6, Some(10))],
            references: vec![user(9, "ada"), user(9, "ada-again"), user(10, "bob")],
            ..JoinInputs::default()
        };
        let out = denormalizer(DuplicatePolicy::Warn).denormalize(inputs).unwrap();
        assert_eq!(out.table.len(), 3);
        assert_eq!(out.integrity.duplicated_keys(), vec![5]);
        assert_eq!(out.integrity.duplicates[0].occurrences, 2);
        assert_eq!(out.integrity.dropped_rows, 0);
    }

    #[test]
    fn dedupe_policy_keeps_first_row_per_key() {
        let inputs = JoinInputs {
            sample: vec![post(5, None), post(5, None), post(7, None)],
            ..JoinInputs::default()
        };
        let out = denormalizer(DuplicatePolicy::Deduplicate)
            .denormalize(inputs)
            .unwrap();
        assert_eq!(out.integrity.duplicated_keys(), vec![5]);
        assert_eq!(out.integrity.dropped_rows, 1);
        let warning = out.integrity.warning().unwrap();
        assert!(warning.contains("[5]"));
        assert!(warning.contains("1 duplicate row(s) dropped"));
        let ids: Vec<&FieldValue> = out.table.column_values("Id_Post").unwrap();
        assert_eq!(ids, vec![&FieldValue::Int(5), &FieldValue::Int(7)]);
    }

    #[test]
    fn projection_ignores_fields_outside_the_column_list() {
        let mut extra = post(5, None);
        extra.insert("Body", "<p>long</p>");
        let inputs = JoinInputs {
            sample: vec![extra],
            ..JoinInputs::default()
        };
        let out = denormalizer(DuplicatePolicy::Warn).denormalize(inputs).unwrap();
        let names: Vec<&str> = out.table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Id_Post",
                "Title_Post",
                "DisplayName_User",
                "Comments",
                "CommentRecordCount",
                "VoteRecordCount"
            ]
        );
    }

    #[test]
    fn rejects_empty_or_repeated_columns() {
        let empty = Denormalizer::new(DenormalizeConfig {
            columns: Vec::new(),
            ..DenormalizeConfig::default()
        });
        assert!(matches!(empty, Err(PipelineError::Configuration(_))));

        let mut repeated = columns();
        repeated.push(ColumnSpec::new("Id_Post", ColumnSource::Primary("Id".into())));
        let repeated = Denormalizer::new(DenormalizeConfig {
            columns: repeated,
            ..DenormalizeConfig::default()
        });
        assert!(matches!(repeated, Err(PipelineError::Configuration(_))));
    }
}

//! Bounded XML-to-table conversion.
//!
//! Reads the first `limit` records of one source and lays them out as a table
//! whose columns are the union of field names in first-seen order. Fields a
//! record lacks are written as empty strings.

use indexmap::IndexSet;
use tracing::info;

use crate::data::{FieldValue, Record};
use crate::errors::PipelineError;
use crate::source::RecordSource;
use crate::table::{Table, TableColumn};
use crate::types::FieldName;

/// Converts the head of a source into a [`Table`].
#[derive(Clone, Copy, Debug)]
pub struct TableConverter {
    limit: usize,
}

impl TableConverter {
    /// Converter keeping at most `limit` records.
    pub fn new(limit: usize) -> Result<Self, PipelineError> {
        if limit == 0 {
            return Err(PipelineError::Configuration(
                "number of records must be greater than zero".to_string(),
            ));
        }
        Ok(Self { limit })
    }

    /// Maximum number of records read.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Read up to `limit` records tagged `tag`; scanning stops at the limit.
    pub fn collect(&self, source: &dyn RecordSource, tag: &str) -> Result<Vec<Record>, PipelineError> {
        source.scan(tag)?.take(self.limit).collect()
    }

    /// Read, then lay out. Fails with `NoMatchingRecords` when nothing matched.
    pub fn convert(&self, source: &dyn RecordSource, tag: &str) -> Result<Table, PipelineError> {
        let records = self.collect(source, tag)?;
        if records.is_empty() {
            return Err(PipelineError::NoMatchingRecords {
                tag: tag.to_string(),
            });
        }
        let table = records_to_table(&records);
        info!(
            source = source.id(),
            tag,
            records = table.len(),
            columns = table.columns().len(),
            "converted records to table"
        );
        Ok(table)
    }
}

/// Lay out `records` as text columns, filling gaps with empty strings.
pub fn records_to_table(records: &[Record]) -> Table {
    let names: IndexSet<&FieldName> = records.iter().flat_map(Record::field_names).collect();
    let mut table = Table::new(names.iter().map(|name| TableColumn::text(*name)).collect());
    for record in records {
        let row = names
            .iter()
            .map(|name| {
                record
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| FieldValue::from(""))
            })
            .collect();
        table.push_row(row);
    }
    table
}

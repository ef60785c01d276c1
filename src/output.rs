//! Table sinks.
//!
//! The default sink writes one Parquet file with a single row group. Text
//! columns are `OPTIONAL BINARY (UTF8)` with nulls encoded as definition
//! level 0; count columns are `REQUIRED INT64`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parquet::basic::{ConvertedType, Repetition, Type as PhysicalType};
use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::Type;
use tracing::info;

use crate::errors::PipelineError;
use crate::table::{ColumnKind, Table};

/// Destination for a finished table.
pub trait TableWriter {
    /// Persist `table`.
    fn write(&self, table: &Table) -> Result<(), PipelineError>;
}

/// Writes a table to a Parquet file, replacing any existing file.
#[derive(Clone, Debug)]
pub struct ParquetTableWriter {
    path: PathBuf,
}

impl ParquetTableWriter {
    /// Writer targeting `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn schema(table: &Table) -> Result<Type, PipelineError> {
        let mut fields = Vec::with_capacity(table.columns().len());
        for column in table.columns() {
            let field = match column.kind {
                ColumnKind::Text => {
                    Type::primitive_type_builder(&column.name, PhysicalType::BYTE_ARRAY)
                        .with_repetition(Repetition::OPTIONAL)
                        .with_converted_type(ConvertedType::UTF8)
                        .build()?
                }
                ColumnKind::Count => {
                    Type::primitive_type_builder(&column.name, PhysicalType::INT64)
                        .with_repetition(Repetition::REQUIRED)
                        .build()?
                }
            };
            fields.push(Arc::new(field));
        }
        Ok(Type::group_type_builder("table").with_fields(fields).build()?)
    }
}

impl TableWriter for ParquetTableWriter {
    fn write(&self, table: &Table) -> Result<(), PipelineError> {
        let schema = Arc::new(Self::schema(table)?);
        let props = Arc::new(WriterProperties::builder().build());
        let file = File::create(&self.path)?;
        let mut writer = SerializedFileWriter::new(file, schema, props)?;
        let mut row_group = writer.next_row_group()?;

        for (idx, column) in table.columns().iter().enumerate() {
            let Some(mut col_writer) = row_group.next_column()? else {
                return Err(PipelineError::Output(format!(
                    "parquet schema ended before column '{}'",
                    column.name
                )));
            };
            match column.kind {
                ColumnKind::Text => {
                    let mut values = Vec::with_capacity(table.len());
                    let mut def_levels = Vec::with_capacity(table.len());
                    for row in table.rows() {
                        let value = &row[idx];
                        if value.is_null() {
                            def_levels.push(0);
                        } else {
                            def_levels.push(1);
                            values.push(ByteArray::from(value.to_string().into_bytes()));
                        }
                    }
                    col_writer
                        .typed::<ByteArrayType>()
                        .write_batch(&values, Some(&def_levels), None)?;
                }
                ColumnKind::Count => {
                    let values: Vec<i64> = table
                        .rows()
                        .iter()
                        .map(|row| row[idx].as_key().unwrap_or(0))
                        .collect();
                    col_writer
                        .typed::<Int64Type>()
                        .write_batch(&values, None, None)?;
                }
            }
            col_writer.close()?;
        }

        row_group.close()?;
        writer.close()?;
        info!(
            path = %self.path.display(),
            rows = table.len(),
            columns = table.columns().len(),
            "wrote parquet table"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FieldValue;
    use crate::table::TableColumn;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use parquet::record::Field;
    use tempfile::tempdir;

    #[test]
    fn writes_nullable_text_and_count_columns() {
        let mut table = Table::new(vec![
            TableColumn::text("Id_Post"),
            TableColumn::text("DisplayName_User"),
            TableColumn::count("VoteRecordCount"),
        ]);
        table.push_row(vec![
            FieldValue::Int(5),
            FieldValue::from("ada"),
            FieldValue::Int(2),
        ]);
        table.push_row(vec![FieldValue::Int(6), FieldValue::Null, FieldValue::Int(0)]);

        let temp = tempdir().unwrap();
        let path = temp.path().join("out.parquet");
        ParquetTableWriter::new(&path).write(&table).unwrap();

        let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 2);
        let rows: Vec<_> = reader
            .get_row_iter(None)
            .unwrap()
            .map(|row| row.unwrap())
            .collect();
        let first: Vec<(String, Field)> = rows[0]
            .get_column_iter()
            .map(|(name, field)| (name.clone(), field.clone()))
            .collect();
        assert_eq!(first[0], ("Id_Post".to_string(), Field::Str("5".into())));
        assert_eq!(first[1], ("DisplayName_User".to_string(), Field::Str("ada".into())));
        assert_eq!(first[2], ("VoteRecordCount".to_string(), Field::Long(2)));
        let second: Vec<Field> = rows[1]
            .get_column_iter()
            .map(|(_, field)| field.clone())
            .collect();
        assert_eq!(second[1], Field::Null);
    }

    #[test]
    fn empty_table_still_produces_a_readable_file() {
        let table = Table::new(vec![TableColumn::text("Id_Post")]);
        let temp = tempdir().unwrap();
        let path = temp.path().join("empty.parquet");
        ParquetTableWriter::new(&path).write(&table).unwrap();
        let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 0);
    }

    #[test]
    fn unwritable_destination_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing_dir").join("out.parquet");
        let table = Table::new(vec![TableColumn::text("a")]);
        assert!(ParquetTableWriter::new(path).write(&table).is_err());
    }
}

use crate::data::FieldValue;
use crate::types::FieldName;

/// Physical type of an output column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Optional text; integers are rendered in decimal.
    Text,
    /// Required non-negative count.
    Count,
}

/// Named, typed output column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableColumn {
    pub name: FieldName,
    pub kind: ColumnKind,
}

impl TableColumn {
    /// Text column named `name`.
    pub fn text(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Text,
        }
    }

    /// Count column named `name`.
    pub fn count(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Count,
        }
    }
}

/// Flat table with a fixed column list; every row has one value per column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<TableColumn>,
    rows: Vec<Vec<FieldValue>>,
}

impl Table {
    /// Empty table with `columns`.
    pub fn new(columns: Vec<TableColumn>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with `Null`; extra values are dropped.
    pub fn push_row(&mut self, mut row: Vec<FieldValue>) {
        row.resize(self.columns.len(), FieldValue::Null);
        self.rows.push(row);
    }

    /// Column definitions in output order.
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// Rows in output order.
    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Value at `row` in the column named `name`.
    pub fn value(&self, row: usize, name: &str) -> Option<&FieldValue> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|values| values.get(idx))
    }

    /// All values of the column named `name`, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<Vec<&FieldValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

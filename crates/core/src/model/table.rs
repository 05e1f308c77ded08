use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::value::{ColumnKind, Value};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TableError {
    #[error("column `{name}` has {len} values, expected {expected}")]
    RaggedColumn {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("row {row} has {len} values, expected {expected}")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("column `{name}` is declared {kind} but holds a {found} value at row {row}")]
    KindMismatch {
        name: String,
        kind: ColumnKind,
        found: ColumnKind,
        row: usize,
    },

    #[error("result declares {declared} rows but its columns hold {actual}")]
    RowCount { declared: usize, actual: usize },
}

//
// ─── COLUMN ────────────────────────────────────────────────────────────────────
//

/// A named column whose values all share one kind (or are null).
///
/// Deserialization goes through [`Column::new`], so the kind invariant holds
/// for columns read back from JSON too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColumnRepr")]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl Column {
    /// Build a column with an explicit kind.
    ///
    /// # Errors
    ///
    /// Returns `TableError::KindMismatch` if a non-null value does not match `kind`.
    pub fn new(
        name: impl Into<String>,
        kind: ColumnKind,
        values: Vec<Value>,
    ) -> Result<Self, TableError> {
        let name = name.into();
        for (row, value) in values.iter().enumerate() {
            let found = value.kind();
            if found != ColumnKind::Null && found != kind {
                return Err(TableError::KindMismatch {
                    name,
                    kind,
                    found,
                    row,
                });
            }
        }
        Ok(Self { name, kind, values })
    }

    /// Build a column and infer its kind from the values, widening as needed.
    #[must_use]
    pub fn infer(name: impl Into<String>, values: Vec<Value>) -> Self {
        let kind = values
            .iter()
            .fold(ColumnKind::Null, |acc, v| acc.unify(v.kind()));
        let values = values.into_iter().map(|v| v.coerce(kind)).collect();
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_parts(self) -> (String, ColumnKind, Vec<Value>) {
        (self.name, self.kind, self.values)
    }

    pub(crate) fn from_parts(name: String, kind: ColumnKind, values: Vec<Value>) -> Self {
        Self { name, kind, values }
    }
}

#[derive(Deserialize)]
struct ColumnRepr {
    name: String,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl TryFrom<ColumnRepr> for Column {
    type Error = TableError;

    fn try_from(repr: ColumnRepr) -> Result<Self, Self::Error> {
        Column::new(repr.name, repr.kind, repr.values)
    }
}

//
// ─── TABULAR RESULT ────────────────────────────────────────────────────────────
//

/// Ordered named columns of equal length, as returned by a query.
///
/// The row count is carried separately so that a result with rows but no
/// columns is still representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TabularResultRepr")]
pub struct TabularResult {
    columns: Vec<Column>,
    row_count: usize,
}

impl TabularResult {
    /// Build a result from columns that must all have the same length.
    ///
    /// # Errors
    ///
    /// Returns `TableError::RaggedColumn` if the column lengths differ.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map_or(0, Column::len);
        for column in &columns {
            if column.len() != row_count {
                return Err(TableError::RaggedColumn {
                    name: column.name.clone(),
                    len: column.len(),
                    expected: row_count,
                });
            }
        }
        Ok(Self { columns, row_count })
    }

    /// Build a result from row-major data, inferring each column's kind.
    ///
    /// # Errors
    ///
    /// Returns `TableError::RaggedRow` if a row's width differs from the header.
    pub fn from_rows<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, TableError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let width = names.len();
        let row_count = rows.len();

        let mut cells: Vec<Vec<Value>> = (0..width).map(|_| Vec::with_capacity(row_count)).collect();
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(TableError::RaggedRow {
                    row: idx,
                    len: row.len(),
                    expected: width,
                });
            }
            for (col, value) in row.into_iter().enumerate() {
                cells[col].push(value);
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::infer(name, values))
            .collect();
        Ok(Self { columns, row_count })
    }

    /// A result with no columns and no rows.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            row_count: 0,
        }
    }

    pub(crate) fn from_parts_unchecked(columns: Vec<Column>, row_count: usize) -> Self {
        Self { columns, row_count }
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Values of row `idx`, in column order.
    #[must_use]
    pub fn row(&self, idx: usize) -> Option<Vec<&Value>> {
        (idx < self.row_count).then(|| self.columns.iter().map(|c| &c.values[idx]).collect())
    }

    /// Iterate rows in their current order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count).map(|idx| self.columns.iter().map(|c| &c.values[idx]).collect())
    }

    pub(crate) fn into_columns(self) -> (Vec<Column>, usize) {
        (self.columns, self.row_count)
    }
}

#[derive(Deserialize)]
struct TabularResultRepr {
    columns: Vec<Column>,
    row_count: usize,
}

impl TryFrom<TabularResultRepr> for TabularResult {
    type Error = TableError;

    fn try_from(repr: TabularResultRepr) -> Result<Self, Self::Error> {
        if repr.columns.is_empty() {
            return Ok(Self::from_parts_unchecked(Vec::new(), repr.row_count));
        }
        let table = TabularResult::new(repr.columns)?;
        if table.row_count != repr.row_count {
            return Err(TableError::RowCount {
                declared: repr.row_count,
                actual: table.row_count,
            });
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_infers_and_widens_kinds() {
        let table = TabularResult::from_rows(
            ["title", "rating"],
            vec![
                vec!["A".into(), Value::Integer(4)],
                vec!["B".into(), Value::Float(4.5)],
                vec!["C".into(), Value::Null],
            ],
        )
        .unwrap();

        assert_eq!(table.row_count(), 3);
        let rating = table.column("rating").unwrap();
        assert_eq!(rating.kind(), ColumnKind::Float);
        assert_eq!(rating.values()[0], Value::Float(4.0));
        assert!(rating.values()[2].is_null());
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = TabularResult::from_rows(["a", "b"], vec![vec![Value::Integer(1)]]).unwrap_err();
        assert!(matches!(err, TableError::RaggedRow { row: 0, len: 1, expected: 2 }));
    }

    #[test]
    fn new_rejects_columns_of_different_length() {
        let a = Column::new("a", ColumnKind::Integer, vec![Value::Integer(1)]).unwrap();
        let b = Column::new("b", ColumnKind::Integer, vec![]).unwrap();
        let err = TabularResult::new(vec![a, b]).unwrap_err();
        assert!(matches!(err, TableError::RaggedColumn { .. }));
    }

    #[test]
    fn column_new_rejects_foreign_kind() {
        let err = Column::new("a", ColumnKind::Integer, vec![Value::Text("x".into())]).unwrap_err();
        assert!(matches!(err, TableError::KindMismatch { row: 0, .. }));
    }

    #[test]
    fn zero_column_result_keeps_row_count() {
        let table = TabularResult::from_rows(Vec::<String>::new(), vec![vec![], vec![]]).unwrap();
        assert_eq!(table.column_count(), 0);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows().count(), 2);
    }

    #[test]
    fn deserialize_checks_column_lengths() {
        let json = r#"{"columns":[
            {"name":"a","kind":"integer","values":[1,2]},
            {"name":"b","kind":"integer","values":[1]}
        ],"row_count":2}"#;
        let err = serde_json::from_str::<TabularResult>(json).unwrap_err();
        assert!(err.to_string().contains("column `b` has 1 values"), "{err}");
    }

    #[test]
    fn deserialize_checks_row_count_and_kinds() {
        let short = r#"{"columns":[{"name":"a","kind":"integer","values":[1]}],"row_count":3}"#;
        assert!(serde_json::from_str::<TabularResult>(short).is_err());

        let mixed = r#"{"name":"a","kind":"integer","values":[1,"x"]}"#;
        assert!(serde_json::from_str::<Column>(mixed).is_err());
    }

    #[test]
    fn serialized_result_reads_back() {
        let table = TabularResult::from_rows(
            ["title", "rating"],
            vec![vec!["A".into(), Value::Float(4.5)], vec![Value::Null, Value::Float(3.0)]],
        )
        .unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(serde_json::from_str::<TabularResult>(&json).unwrap(), table);
    }
}

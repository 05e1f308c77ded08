//! CSV import and export for learner-supplied tables.
//!
//! Column kinds are inferred once per file from the raw cells: a column is
//! `Integer` if every non-empty cell parses as one, `Float` if every cell
//! parses as a number, and `Text` otherwise. Empty cells are nulls.

use std::io;

use csv::{ReaderBuilder, WriterBuilder};
use drill_core::model::{Column, ColumnKind, TableError, TabularResult, Value};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CsvError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Parse CSV text with a header row into a typed result.
///
/// # Errors
///
/// Returns `CsvError::Csv` for malformed input, including rows whose width
/// differs from the header.
pub fn parse_csv(data: &[u8]) -> Result<TabularResult, CsvError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(data);
    let names: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, header)| header_name(idx, header))
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_owned());
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| {
            let kind = infer_kind(&raw);
            let values = raw.iter().map(|cell| parse_cell(cell, kind)).collect();
            Column::new(name, kind, values)
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(columns = columns.len(), "csv parsed");
    Ok(TabularResult::new(columns)?)
}

/// Write `result` as CSV with a header row; nulls become empty cells.
///
/// # Errors
///
/// Returns `CsvError` if the writer fails.
pub fn write_csv<W: io::Write>(result: &TabularResult, writer: W) -> Result<(), CsvError> {
    let mut out = WriterBuilder::new().from_writer(writer);
    out.write_record(result.column_names())?;
    for row in result.rows() {
        out.write_record(row.into_iter().map(cell_text))?;
    }
    out.flush()?;
    Ok(())
}

/// Table name derived from a file stem: anything but ASCII letters, digits
/// and `_` becomes `_`, and a leading digit gets a `t_` prefix.
#[must_use]
pub fn relation_name(stem: &str) -> String {
    let name: String = stem
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match name.chars().next() {
        None => "data".to_owned(),
        Some(c) if c.is_ascii_digit() => format!("t_{name}"),
        Some(_) => name,
    }
}

fn header_name(idx: usize, header: &str) -> String {
    let header = header.trim();
    if header.is_empty() {
        format!("column_{}", idx + 1)
    } else {
        header.to_owned()
    }
}

fn infer_kind(cells: &[String]) -> ColumnKind {
    cells
        .iter()
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .map(|cell| {
            if cell.parse::<i64>().is_ok() {
                ColumnKind::Integer
            } else if cell.parse::<f64>().is_ok() {
                ColumnKind::Float
            } else {
                ColumnKind::Text
            }
        })
        .fold(ColumnKind::Null, ColumnKind::unify)
}

fn parse_cell(cell: &str, kind: ColumnKind) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match kind {
        ColumnKind::Integer => trimmed.parse().map_or(Value::Null, Value::Integer),
        ColumnKind::Float => trimmed.parse().map_or(Value::Null, Value::Float),
        _ => Value::Text(cell.to_owned()),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PENGUINS: &str = "\
species,island,body_mass_g,bill_length_mm
Adelie,Torgersen,3750,39.1
Gentoo,Biscoe,,46.5
Chinstrap,Dream,3500,
";

    #[test]
    fn kinds_are_inferred_per_column() {
        let table = parse_csv(PENGUINS.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("species").unwrap().kind(), ColumnKind::Text);
        assert_eq!(table.column("body_mass_g").unwrap().kind(), ColumnKind::Integer);
        assert_eq!(table.column("bill_length_mm").unwrap().kind(), ColumnKind::Float);
        assert_eq!(table.column("body_mass_g").unwrap().values()[1], Value::Null);
    }

    #[test]
    fn mixed_numbers_widen_and_words_fall_back_to_text() {
        let table = parse_csv(b"a,b\n1,7\n2.5,n/a\n").unwrap();
        assert_eq!(table.column("a").unwrap().kind(), ColumnKind::Float);
        assert_eq!(table.column("a").unwrap().values()[0], Value::Float(1.0));
        assert_eq!(table.column("b").unwrap().kind(), ColumnKind::Text);
        assert_eq!(table.column("b").unwrap().values()[0], Value::from("7"));
    }

    #[test]
    fn blank_headers_get_positional_names() {
        let table = parse_csv(b"id,\n1,x\n").unwrap();
        assert_eq!(table.column_names(), vec!["id", "column_2"]);
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let err = parse_csv(b"a,b\n1\n").unwrap_err();
        assert!(matches!(err, CsvError::Csv(_)), "{err}");
    }

    #[test]
    fn export_writes_header_and_blank_nulls() {
        let table = parse_csv(PENGUINS.as_bytes()).unwrap();
        let mut buffer = Vec::new();
        write_csv(&table, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("species,island,body_mass_g,bill_length_mm"));
        assert_eq!(lines.nth(1), Some("Gentoo,Biscoe,,46.5"));
    }

    #[test]
    fn relation_names_are_sanitized() {
        assert_eq!(relation_name("penguins"), "penguins");
        assert_eq!(relation_name("my data-2024"), "my_data_2024");
        assert_eq!(relation_name("2024 sales"), "t_2024_sales");
        assert_eq!(relation_name(""), "data");
    }
}

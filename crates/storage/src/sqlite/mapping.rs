use drill_core::model::{Column as ResultColumn, ColumnKind, TabularResult, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::runner::RunnerFault;

fn decode<E: core::fmt::Display>(e: E) -> RunnerFault {
    RunnerFault::Decode(e.to_string())
}

/// Map a driver error onto the learner-facing fault.
pub(crate) fn engine_fault(e: sqlx::Error) -> RunnerFault {
    match e {
        sqlx::Error::Database(db) => RunnerFault::Engine(db.message().to_owned()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => decode(e),
        other => RunnerFault::Connection(other.to_string()),
    }
}

/// Read one cell using the value's runtime storage class.
pub(crate) fn decode_value(row: &SqliteRow, idx: usize) -> Result<Value, RunnerFault> {
    let raw = row.try_get_raw(idx).map_err(decode)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => {
            Value::Integer(row.try_get_unchecked::<i64, _>(idx).map_err(decode)?)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            Value::Float(row.try_get_unchecked::<f64, _>(idx).map_err(decode)?)
        }
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx).map_err(decode)?;
            Value::Text(blob_literal(&bytes))
        }
        _ => Value::Text(row.try_get_unchecked::<String, _>(idx).map_err(decode)?),
    };
    Ok(value)
}

fn blob_literal(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
    format!("x'{hex}'")
}

/// Build a result from fetched rows; column kinds are inferred from content.
pub(crate) fn map_rows(rows: &[SqliteRow]) -> Result<TabularResult, RunnerFault> {
    let Some(first) = rows.first() else {
        return Ok(TabularResult::empty());
    };
    let names: Vec<String> = first.columns().iter().map(|c| c.name().to_owned()).collect();

    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(names.len());
        for idx in 0..names.len() {
            values.push(decode_value(row, idx)?);
        }
        cells.push(values);
    }

    TabularResult::from_rows(names, cells).map_err(decode)
}

/// Header-only result for a query that returned no rows.
///
/// With no values to infer from, every column gets the null kind.
pub(crate) fn empty_result(names: Vec<String>) -> Result<TabularResult, RunnerFault> {
    let columns = names
        .into_iter()
        .map(|name| ResultColumn::new(name, ColumnKind::Null, Vec::new()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(decode)?;
    TabularResult::new(columns).map_err(decode)
}

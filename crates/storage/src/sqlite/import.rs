use drill_core::model::{ColumnKind, TabularResult, Value};
use sqlx::{Executor, Sqlite};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;

use super::{SqliteRunner, ensure_relation, with_writes};
use crate::runner::RunnerFault;
use crate::sqlite::mapping::{engine_fault, map_rows};

type InsertQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

impl SqliteRunner {
    /// Create (or replace) table `name` holding the rows of `table`.
    ///
    /// Column types follow the inferred kinds: integers and booleans become
    /// `INTEGER`, floats `REAL`, everything else `TEXT`. The whole load runs
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RunnerFault::Refused` for a table without columns, or the
    /// engine's fault if any statement fails.
    pub async fn load_table(&self, name: &str, table: &TabularResult) -> Result<(), RunnerFault> {
        if table.columns().is_empty() {
            return Err(RunnerFault::Refused(format!(
                "table {name} needs at least one column"
            )));
        }
        let ident = quote_ident(name);
        let definitions = table
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), sql_type(c.kind())))
            .collect::<Vec<_>>()
            .join(", ");
        let create = format!("DROP TABLE IF EXISTS {ident};\nCREATE TABLE {ident} ({definitions});");
        let placeholders = vec!["?"; table.columns().len()].join(", ");
        let insert = format!("INSERT INTO {ident} VALUES ({placeholders})");
        let rows: Vec<Vec<Value>> = table
            .rows()
            .map(|row| row.into_iter().cloned().collect())
            .collect();
        let row_count = rows.len();

        let mut conn = self.acquire().await?;
        with_writes(&mut conn, |conn| {
            Box::pin(async move {
                let mut tx = sqlx::Connection::begin(&mut **conn)
                    .await
                    .map_err(engine_fault)?;
                tx.as_mut()
                    .execute(sqlx::raw_sql(&create))
                    .await
                    .map_err(engine_fault)?;
                for row in rows {
                    tx.as_mut()
                        .execute(row.into_iter().fold(sqlx::query(&insert), bind_value))
                        .await
                        .map_err(engine_fault)?;
                }
                tx.commit().await.map_err(engine_fault)
            })
        })
        .await?;

        tracing::info!(table = name, rows = row_count, "table loaded");
        Ok(())
    }

    /// Column names and declared types of `relation`, in table order.
    ///
    /// # Errors
    ///
    /// Returns `RunnerFault::UnknownRelation` if `relation` does not exist.
    pub async fn schema(&self, relation: &str) -> Result<TabularResult, RunnerFault> {
        let mut conn = self.acquire().await?;
        ensure_relation(&mut conn, relation).await?;
        let rows = sqlx::query(
            "SELECT name AS column_name, type AS declared_type FROM pragma_table_info(?1) ORDER BY cid",
        )
        .bind(relation)
        .fetch_all(&mut *conn)
        .await
        .map_err(engine_fault)?;
        map_rows(&rows)
    }
}

fn bind_value(query: InsertQuery<'_>, value: Value) -> InsertQuery<'_> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(b),
        Value::Integer(i) => query.bind(i),
        Value::Float(f) => query.bind(f),
        Value::Text(s) => query.bind(s),
    }
}

fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Bool | ColumnKind::Integer => "INTEGER",
        ColumnKind::Float => "REAL",
        ColumnKind::Text | ColumnKind::Null => "TEXT",
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted_and_escaped() {
        assert_eq!(quote_ident("books"), "\"books\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn kinds_map_to_sqlite_types() {
        assert_eq!(sql_type(ColumnKind::Integer), "INTEGER");
        assert_eq!(sql_type(ColumnKind::Bool), "INTEGER");
        assert_eq!(sql_type(ColumnKind::Float), "REAL");
        assert_eq!(sql_type(ColumnKind::Null), "TEXT");
    }
}

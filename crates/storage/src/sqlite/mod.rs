use std::time::Duration;

use async_trait::async_trait;
use drill_core::{RetrievalOnly, single_statement};
use drill_core::model::TabularResult;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Column, Executor, Sqlite, SqlitePool};
use thiserror::Error;

use crate::runner::{QueryRunner, RunnerFault};
use mapping::{empty_result, engine_fault, map_rows};

mod import;
mod mapping;
pub mod sample;
mod script;

pub use script::strip_mysql_statements;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Outcome of a free-form console statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    Rows(TabularResult),
    Affected(u64),
}

impl StatementOutcome {
    /// Message shown for statements that return no rows.
    #[must_use]
    pub fn affected_message(rows: u64) -> String {
        format!("OK, {rows} row(s) affected.")
    }
}

/// Query runner over a single `SQLite` connection.
///
/// The connection is read-only (`PRAGMA query_only`) except while
/// [`reset`](Self::reset), [`execute`](Self::execute) or
/// [`load_table`](Self::load_table) run, so grading can never mutate the
/// dataset even if a statement slips past the retrieval check.
#[derive(Clone)]
pub struct SqliteRunner {
    pool: SqlitePool,
}

impl SqliteRunner {
    /// Connect to `SQLite` using the given URL.
    ///
    /// The pool holds exactly one long-lived connection so that
    /// `sqlite::memory:` databases survive between queries.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or
    /// its pragmas cannot be applied.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA query_only = ON;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        tracing::debug!(database_url, "sqlite runner connected");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Replace the database contents by running `script`.
    ///
    /// MySQL-only `SET FOREIGN_KEY_CHECKS` statements are dropped first.
    ///
    /// # Errors
    ///
    /// Returns `RunnerFault` if any statement of the script fails.
    pub async fn reset(&self, script: &str) -> Result<(), RunnerFault> {
        let script = strip_mysql_statements(script);
        let mut conn = self.acquire().await?;
        let outcome = with_writes(&mut conn, |conn| {
            Box::pin(async move {
                conn.execute(sqlx::raw_sql(&script))
                    .await
                    .map_err(engine_fault)?;
                Ok(())
            })
        })
        .await;
        if outcome.is_ok() {
            tracing::info!("dataset reset");
        }
        outcome
    }

    /// Run any statement outside grading, as the free-form console does.
    ///
    /// Every console statement runs with writes enabled, and `query_only` is
    /// switched back on afterwards even if the statement tried to change it.
    ///
    /// # Errors
    ///
    /// Returns `RunnerFault` with the engine's message if the statement fails.
    pub async fn execute(&self, sql: &str) -> Result<StatementOutcome, RunnerFault> {
        let returns_rows = RetrievalOnly::new(["SELECT", "WITH", "PRAGMA", "VALUES"]).allows(sql);
        let sql = sql.to_owned();
        let mut conn = self.acquire().await?;
        with_writes(&mut conn, |conn| {
            Box::pin(async move {
                if returns_rows {
                    return fetch(conn, &sql).await.map(StatementOutcome::Rows);
                }
                let done = conn
                    .execute(sqlx::raw_sql(&sql))
                    .await
                    .map_err(engine_fault)?;
                Ok(StatementOutcome::Affected(done.rows_affected()))
            })
        })
        .await
    }

    /// Names of user tables and views, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RunnerFault` if the catalog cannot be read.
    pub async fn relations(&self) -> Result<Vec<String>, RunnerFault> {
        let names: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT name FROM sqlite_master
            WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(engine_fault)?;
        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    async fn acquire(&self) -> Result<PoolConnection<Sqlite>, RunnerFault> {
        self.pool
            .acquire()
            .await
            .map_err(|e| RunnerFault::Connection(e.to_string()))
    }
}

type WriteFuture<'c, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, RunnerFault>> + Send + 'c>>;

/// Lift `query_only` for the duration of `work`, restoring it afterwards
/// whether or not `work` succeeded.
async fn with_writes<T, F>(conn: &mut PoolConnection<Sqlite>, work: F) -> Result<T, RunnerFault>
where
    F: for<'c> FnOnce(&'c mut PoolConnection<Sqlite>) -> WriteFuture<'c, T>,
{
    sqlx::query("PRAGMA query_only = OFF;")
        .execute(&mut **conn)
        .await
        .map_err(engine_fault)?;
    let outcome = work(conn).await;
    sqlx::query("PRAGMA query_only = ON;")
        .execute(&mut **conn)
        .await
        .map_err(engine_fault)?;
    outcome
}

async fn fetch(conn: &mut PoolConnection<Sqlite>, sql: &str) -> Result<TabularResult, RunnerFault> {
    let rows = sqlx::query(sql)
        .persistent(false)
        .fetch_all(&mut **conn)
        .await
        .map_err(engine_fault)?;
    if !rows.is_empty() {
        return map_rows(&rows);
    }

    let described = (&mut **conn).describe(sql).await.map_err(engine_fault)?;
    let names = described
        .columns()
        .iter()
        .map(|c| c.name().to_owned())
        .collect();
    empty_result(names)
}

/// Fail with `UnknownRelation` unless `relation` names a table or view.
async fn ensure_relation(conn: &mut PoolConnection<Sqlite>, relation: &str) -> Result<(), RunnerFault> {
    let exists: Option<(i64,)> = sqlx::query_as(
        r"
        SELECT 1 FROM sqlite_master
        WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE
        ",
    )
    .bind(relation)
    .fetch_optional(&mut **conn)
    .await
    .map_err(engine_fault)?;
    match exists {
        Some(_) => Ok(()),
        None => Err(RunnerFault::UnknownRelation(relation.to_owned())),
    }
}

#[async_trait]
impl QueryRunner for SqliteRunner {
    /// Only a single `SELECT`, `WITH` or `VALUES` statement is handed to the
    /// engine; stacked statements and pragmas are refused outright.
    async fn run(&self, sql: &str, relation: &str) -> Result<TabularResult, RunnerFault> {
        let Some(statement) = single_statement(sql) else {
            return Err(RunnerFault::Refused(
                "Only one statement can be run at a time.".to_owned(),
            ));
        };
        if !RetrievalOnly::new(["SELECT", "WITH", "VALUES"]).allows(statement) {
            return Err(RunnerFault::Refused(
                "Only retrieval statements can be graded.".to_owned(),
            ));
        }

        let mut conn = self.acquire().await?;
        ensure_relation(&mut conn, relation).await?;

        tracing::debug!(relation, sql = statement, "running query");
        fetch(&mut conn, statement).await
    }
}

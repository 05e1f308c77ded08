use async_trait::async_trait;
use drill_core::model::TabularResult;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Why the query runner could not produce a result.
///
/// The message is shown to the learner as-is, so engine errors keep the
/// engine's own wording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunnerFault {
    #[error("no such table: {0}")]
    UnknownRelation(String),

    #[error("{0}")]
    Engine(String),

    /// The runner declined the statement before it reached the engine.
    #[error("{0}")]
    Refused(String),

    #[error("could not read result: {0}")]
    Decode(String),

    #[error("connection error: {0}")]
    Connection(String),
}

/// Executes a retrieval query against a named backing relation.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Run `sql` with `relation` as the exercise's backing relation.
    ///
    /// # Errors
    ///
    /// Returns `RunnerFault::UnknownRelation` if `relation` does not exist,
    /// or another `RunnerFault` if the engine rejects or fails the query.
    async fn run(&self, sql: &str, relation: &str) -> Result<TabularResult, RunnerFault>;
}

/// Canned runner for tests and prototyping.
///
/// Queries are matched after collapsing whitespace and dropping a trailing
/// semicolon; anything unregistered fails like an engine syntax error.
#[derive(Clone, Default)]
pub struct InMemoryRunner {
    relations: Arc<Mutex<HashSet<String>>>,
    results: Arc<Mutex<HashMap<String, Result<TabularResult, RunnerFault>>>>,
}

impl InMemoryRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a relation that queries may use.
    ///
    /// # Errors
    ///
    /// Returns `RunnerFault::Connection` if the internal lock is poisoned.
    pub fn add_relation(&self, name: impl Into<String>) -> Result<(), RunnerFault> {
        self.relations
            .lock()
            .map_err(|e| RunnerFault::Connection(e.to_string()))?
            .insert(name.into());
        Ok(())
    }

    /// Register the outcome for a query.
    ///
    /// # Errors
    ///
    /// Returns `RunnerFault::Connection` if the internal lock is poisoned.
    pub fn insert(
        &self,
        sql: &str,
        outcome: Result<TabularResult, RunnerFault>,
    ) -> Result<(), RunnerFault> {
        self.results
            .lock()
            .map_err(|e| RunnerFault::Connection(e.to_string()))?
            .insert(query_key(sql), outcome);
        Ok(())
    }
}

fn query_key(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(';')
        .trim_end()
        .to_owned()
}

#[async_trait]
impl QueryRunner for InMemoryRunner {
    async fn run(&self, sql: &str, relation: &str) -> Result<TabularResult, RunnerFault> {
        let known = self
            .relations
            .lock()
            .map_err(|e| RunnerFault::Connection(e.to_string()))?
            .contains(relation);
        if !known {
            return Err(RunnerFault::UnknownRelation(relation.to_owned()));
        }

        let guard = self
            .results
            .lock()
            .map_err(|e| RunnerFault::Connection(e.to_string()))?;
        guard
            .get(&query_key(sql))
            .cloned()
            .unwrap_or_else(|| Err(RunnerFault::Engine(format!("syntax error in: {sql}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::Value;

    fn species() -> TabularResult {
        TabularResult::from_rows(["species"], vec![vec![Value::from("Adelie")]]).unwrap()
    }

    #[tokio::test]
    async fn registered_query_is_matched_loosely() {
        let runner = InMemoryRunner::new();
        runner.add_relation("penguins").unwrap();
        runner
            .insert("SELECT species FROM penguins", Ok(species()))
            .unwrap();

        let result = runner
            .run("SELECT   species\nFROM penguins ;", "penguins")
            .await
            .unwrap();
        assert_eq!(result, species());
    }

    #[tokio::test]
    async fn unknown_relation_is_a_fault() {
        let runner = InMemoryRunner::new();
        let err = runner.run("SELECT 1", "penguins").await.unwrap_err();
        assert_eq!(err, RunnerFault::UnknownRelation("penguins".into()));
    }

    #[tokio::test]
    async fn unregistered_query_is_an_engine_fault() {
        let runner = InMemoryRunner::new();
        runner.add_relation("penguins").unwrap();
        let err = runner.run("SELEC 1", "penguins").await.unwrap_err();
        assert!(matches!(err, RunnerFault::Engine(_)));
    }
}

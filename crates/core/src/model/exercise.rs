use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ExerciseId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExerciseError {
    #[error("exercise title cannot be empty")]
    EmptyTitle,

    #[error("exercise prompt cannot be empty")]
    EmptyPrompt,

    #[error("exercise solution cannot be empty")]
    EmptySolution,

    #[error("exercise backing relation cannot be empty")]
    EmptyRelation,
}

//
// ─── SOLUTION ──────────────────────────────────────────────────────────────────
//

/// Canonical answer for an exercise.
///
/// `Paired` carries the same answer written twice: once as SQL and once as a
/// call expression (for example `sqldf("SELECT ...")`) accepted by the
/// submission interpreter. The SQL form is always the one executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum Solution {
    Query { sql: String },
    Paired { sql: String, expression: String },
}

impl Solution {
    #[must_use]
    pub fn query(sql: impl Into<String>) -> Self {
        Self::Query { sql: sql.into() }
    }

    #[must_use]
    pub fn paired(sql: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Paired {
            sql: sql.into(),
            expression: expression.into(),
        }
    }

    /// The SQL that produces the expected result.
    #[must_use]
    pub fn sql(&self) -> &str {
        match self {
            Solution::Query { sql } | Solution::Paired { sql, .. } => sql,
        }
    }

    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        match self {
            Solution::Query { .. } => None,
            Solution::Paired { expression, .. } => Some(expression),
        }
    }

    /// Text shown to the learner when the solution is revealed.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Solution::Query { sql } => sql.clone(),
            Solution::Paired { sql, expression } => format!("{sql}\n\n-- or --\n\n{expression}"),
        }
    }
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// An immutable practice exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    id: ExerciseId,
    title: String,
    prompt: String,
    relation: String,
    solution: Solution,
}

impl Exercise {
    /// Creates a validated exercise.
    ///
    /// `relation` names the backing table or view the exercise is evaluated against.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` if any text field (or the solution SQL) is blank.
    pub fn new(
        id: ExerciseId,
        title: impl Into<String>,
        prompt: impl Into<String>,
        relation: impl Into<String>,
        solution: Solution,
    ) -> Result<Self, ExerciseError> {
        let title = title.into();
        let prompt = prompt.into();
        let relation = relation.into();

        if title.trim().is_empty() {
            return Err(ExerciseError::EmptyTitle);
        }
        if prompt.trim().is_empty() {
            return Err(ExerciseError::EmptyPrompt);
        }
        if relation.trim().is_empty() {
            return Err(ExerciseError::EmptyRelation);
        }
        if solution.sql().trim().is_empty() {
            return Err(ExerciseError::EmptySolution);
        }

        Ok(Self {
            id,
            title,
            prompt,
            relation,
            solution,
        })
    }

    #[must_use]
    pub fn id(&self) -> ExerciseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    #[must_use]
    pub fn solution(&self) -> &Solution {
        &self.solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exercise_rejects_blank_solution() {
        let err = Exercise::new(
            ExerciseId::new(1),
            "Species",
            "List every species.",
            "penguins",
            Solution::query("   "),
        )
        .unwrap_err();
        assert_eq!(err, ExerciseError::EmptySolution);
    }

    #[test]
    fn exercise_rejects_blank_relation() {
        let err = Exercise::new(
            ExerciseId::new(1),
            "Species",
            "List every species.",
            "",
            Solution::query("SELECT 1"),
        )
        .unwrap_err();
        assert_eq!(err, ExerciseError::EmptyRelation);
    }

    #[test]
    fn paired_solution_executes_sql_form() {
        let solution = Solution::paired(
            "SELECT DISTINCT species FROM penguins",
            r#"sqldf("SELECT DISTINCT species FROM penguins")"#,
        );
        assert_eq!(solution.sql(), "SELECT DISTINCT species FROM penguins");
        assert!(solution.display_text().contains("sqldf("));
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use drill_core::CanonicalResult;
use drill_core::model::{ExerciseId, RevealEffect, Solution, TabularResult, Verdict};

//
// ─── SUBMIT ────────────────────────────────────────────────────────────────────
//

/// What happened to one submission, ready for a display sink.
///
/// `Rejected` and `Failed` leave the session untouched; the learner may
/// simply try again.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The text is not a retrieval statement (or an allowed call wrapping one).
    Rejected { index: usize, message: String },
    /// The query runner could not execute the statement.
    Failed { index: usize, message: String },
    /// The result matches; `result` is the learner's result in canonical form.
    Correct {
        index: usize,
        result: CanonicalResult,
        verdict: Verdict,
    },
    /// The result differs from the expected one.
    Incorrect {
        index: usize,
        result: TabularResult,
        expected: TabularResult,
    },
}

impl SubmitOutcome {
    /// Index of the exercise the submission was made against.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            SubmitOutcome::Rejected { index, .. }
            | SubmitOutcome::Failed { index, .. }
            | SubmitOutcome::Correct { index, .. }
            | SubmitOutcome::Incorrect { index, .. } => *index,
        }
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        matches!(self, SubmitOutcome::Correct { .. })
    }

    /// Whether this submission finished the last exercise.
    #[must_use]
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            SubmitOutcome::Correct {
                verdict: Verdict::Completed { .. },
                ..
            }
        )
    }

    /// Learner-facing message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            SubmitOutcome::Rejected { message, .. } => message.clone(),
            SubmitOutcome::Failed { message, .. } => format!("Error executing query: {message}"),
            SubmitOutcome::Correct {
                verdict: Verdict::Advanced { to, .. },
                ..
            } => format!("Correct! Exercise {} is unlocked.", to + 1),
            SubmitOutcome::Correct { .. } => "Correct! You finished every exercise.".to_owned(),
            SubmitOutcome::Incorrect { .. } => {
                "Not quite: your result does not match the expected result.".to_owned()
            }
        }
    }
}

//
// ─── REVEAL ────────────────────────────────────────────────────────────────────
//

/// Solution and expected result surfaced by a reveal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevealOutcome {
    pub index: usize,
    pub solution: Solution,
    pub expected: TabularResult,
    pub effect: RevealEffect,
}

//
// ─── ATTEMPT LOG ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Correct,
    Incorrect,
    Rejected,
    Failed,
    Revealed,
}

impl From<&SubmitOutcome> for AttemptKind {
    fn from(outcome: &SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Rejected { .. } => AttemptKind::Rejected,
            SubmitOutcome::Failed { .. } => AttemptKind::Failed,
            SubmitOutcome::Correct { .. } => AttemptKind::Correct,
            SubmitOutcome::Incorrect { .. } => AttemptKind::Incorrect,
        }
    }
}

/// One learner action, as recorded in the session's attempt log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub exercise_id: ExerciseId,
    pub kind: AttemptKind,
    pub text: Option<String>,
    pub at: DateTime<Utc>,
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Aggregate for a completed practice session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PracticeSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total: usize,
    pub solved: usize,
    pub skipped: usize,
    pub attempts: usize,
    pub incorrect: usize,
}

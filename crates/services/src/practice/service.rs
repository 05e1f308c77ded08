use chrono::{DateTime, Utc};
use std::fmt;

use drill_core::model::{
    Exercise, ExerciseStatus, ProgressView, SessionState, TabularResult,
};

use super::outcome::{AttemptKind, AttemptRecord, PracticeSummary};

/// One learner's practice run over a fixed exercise sequence.
///
/// Holds the exercises, their precomputed expected results and the
/// progression state. Only `PracticeLoopService` mutates it.
pub struct PracticeSession {
    exercises: Vec<Exercise>,
    expected: Vec<TabularResult>,
    state: SessionState,
    attempts: Vec<AttemptRecord>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl PracticeSession {
    pub(crate) fn new(
        exercises: Vec<Exercise>,
        expected: Vec<TabularResult>,
        state: SessionState,
        started_at: DateTime<Utc>,
    ) -> Self {
        debug_assert_eq!(exercises.len(), expected.len());
        debug_assert_eq!(exercises.len(), state.exercise_count());
        Self {
            exercises,
            expected,
            state,
            attempts: Vec::new(),
            started_at,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.current_index()
    }

    #[must_use]
    pub fn current_exercise(&self) -> &Exercise {
        &self.exercises[self.state.current_index()]
    }

    #[must_use]
    pub fn current_expected(&self) -> &TabularResult {
        &self.expected[self.state.current_index()]
    }

    /// Expected result of exercise `index`, once it has been reached.
    #[must_use]
    pub fn expected(&self, index: usize) -> Option<&TabularResult> {
        (index <= self.state.current_index())
            .then(|| self.expected.get(index))
            .flatten()
    }

    /// Last text the learner submitted for the current exercise.
    #[must_use]
    pub fn current_draft(&self) -> Option<&str> {
        self.state.draft(self.state.current_index())
    }

    #[must_use]
    pub fn progress(&self) -> ProgressView {
        self.state.progress()
    }

    #[must_use]
    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub(crate) fn record_attempt(
        &mut self,
        kind: AttemptKind,
        text: Option<String>,
        at: DateTime<Utc>,
    ) {
        let exercise_id = self.current_exercise().id();
        self.attempts.push(AttemptRecord {
            exercise_id,
            kind,
            text,
            at,
        });
    }

    /// Stamp the completion time the first time the session completes.
    pub(crate) fn mark_completed(&mut self, at: DateTime<Utc>) -> bool {
        if self.completed_at.is_some() || !self.state.is_complete() {
            return false;
        }
        self.completed_at = Some(at);
        true
    }

    /// Summary of a completed session; `None` while exercises remain.
    #[must_use]
    pub fn summary(&self) -> Option<PracticeSummary> {
        let completed_at = self.completed_at?;
        let progress = self.state.progress();
        let incorrect = self
            .attempts
            .iter()
            .filter(|a| a.kind == AttemptKind::Incorrect)
            .count();
        Some(PracticeSummary {
            started_at: self.started_at,
            completed_at,
            total: self.exercises.len(),
            solved: progress.solved,
            skipped: progress.skipped,
            attempts: self.attempts.len(),
            incorrect,
        })
    }

    /// Status of exercise `index`, if it exists.
    #[must_use]
    pub fn status(&self, index: usize) -> Option<ExerciseStatus> {
        self.state.status(index)
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("exercises_len", &self.exercises.len())
            .field("current", &self.state.current_index())
            .field("attempts_len", &self.attempts.len())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

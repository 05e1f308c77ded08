use std::sync::Arc;

use drill_core::grading::result_equals_with;
use drill_core::model::{Exercise, SessionState, SkipPolicy};
use drill_core::normalize::canonicalize;
use drill_core::{
    Capabilities, GradingOptions, PolicyViolation, RetrievalOnly, StatementPolicy, Submission,
};
use storage::QueryRunner;

use super::outcome::{AttemptKind, RevealOutcome, SubmitOutcome};
use super::service::PracticeSession;
use crate::Clock;
use crate::error::PracticeError;

/// Drives practice sessions: precomputes expected results, grades
/// submissions and handles reveals.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    runner: Arc<dyn QueryRunner>,
    policy: Arc<dyn StatementPolicy>,
    capabilities: Capabilities,
    options: GradingOptions,
    skip_policy: SkipPolicy,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(clock: Clock, runner: Arc<dyn QueryRunner>) -> Self {
        Self {
            clock,
            runner,
            policy: Arc::new(RetrievalOnly::default()),
            capabilities: Capabilities::default(),
            options: GradingOptions::default(),
            skip_policy: SkipPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn StatementPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn with_grading_options(mut self, options: GradingOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_skip_policy(mut self, skip_policy: SkipPolicy) -> Self {
        self.skip_policy = skip_policy;
        self
    }

    /// Start a session over `exercises`, running every canonical solution
    /// once to obtain the expected results.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Empty` for an empty exercise list and
    /// `PracticeError::Solution` if a canonical solution cannot be executed.
    pub async fn start_session(
        &self,
        exercises: Vec<Exercise>,
    ) -> Result<PracticeSession, PracticeError> {
        if exercises.is_empty() {
            return Err(PracticeError::Empty);
        }

        let mut expected = Vec::with_capacity(exercises.len());
        for exercise in &exercises {
            let result = self
                .runner
                .run(exercise.solution().sql(), exercise.relation())
                .await
                .map_err(|fault| {
                    tracing::warn!(exercise = %exercise.id(), %fault, "canonical solution failed");
                    PracticeError::Solution {
                        exercise: exercise.id(),
                        fault,
                    }
                })?;
            expected.push(result);
        }

        let state = SessionState::new(exercises.len())?.with_skip_policy(self.skip_policy);
        tracing::info!(exercises = exercises.len(), "practice session started");
        Ok(PracticeSession::new(exercises, expected, state, self.clock.now()))
    }

    /// Grade `text` against the current exercise.
    ///
    /// Never fails: refused or failing statements come back as
    /// `SubmitOutcome::Rejected` / `SubmitOutcome::Failed` and leave the
    /// session where it was.
    pub async fn submit(&self, session: &mut PracticeSession, text: &str) -> SubmitOutcome {
        let index = session.current_index();
        session.state_mut().save_draft(text);

        let outcome = match self.check(text) {
            Err(violation) => SubmitOutcome::Rejected {
                index,
                message: violation.message().to_owned(),
            },
            Ok(sql) => self.grade(session, &sql).await,
        };

        let now = self.clock.now();
        session.record_attempt(AttemptKind::from(&outcome), Some(text.to_owned()), now);
        if session.mark_completed(now) {
            tracing::info!("practice session completed");
        }
        tracing::debug!(index, kind = ?AttemptKind::from(&outcome), "submission graded");
        outcome
    }

    /// Reveal the current exercise's solution, marking it skipped unless
    /// it is already solved. The session does not advance.
    pub fn reveal(&self, session: &mut PracticeSession) -> RevealOutcome {
        let index = session.current_index();
        let effect = session.state_mut().reveal();
        let outcome = RevealOutcome {
            index,
            solution: session.current_exercise().solution().clone(),
            expected: session.current_expected().clone(),
            effect,
        };

        let now = self.clock.now();
        session.record_attempt(AttemptKind::Revealed, None, now);
        if session.mark_completed(now) {
            tracing::info!("practice session completed");
        }
        outcome
    }

    /// Usage check that runs before the query runner is ever reached.
    fn check(&self, text: &str) -> Result<String, PolicyViolation> {
        let submission = Submission::parse(text, &self.capabilities)?;
        self.policy.check(submission.sql())?;
        Ok(submission.sql().to_owned())
    }

    async fn grade(&self, session: &mut PracticeSession, sql: &str) -> SubmitOutcome {
        let index = session.current_index();
        let relation = session.current_exercise().relation().to_owned();

        let result = match self.runner.run(sql, &relation).await {
            Ok(result) => result,
            Err(fault) => {
                tracing::debug!(index, %fault, "learner query failed");
                return SubmitOutcome::Failed {
                    index,
                    message: fault.to_string(),
                };
            }
        };

        let expected = session.current_expected();
        let correct = result_equals_with(Some(&result), Some(expected), self.options);
        if !correct {
            return SubmitOutcome::Incorrect {
                index,
                expected: expected.clone(),
                result,
            };
        }

        let verdict = session.state_mut().record_verdict(true);
        SubmitOutcome::Correct {
            index,
            result: canonicalize(&result, self.options),
            verdict,
        }
    }
}

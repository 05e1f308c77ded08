use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("a practice session needs at least one exercise")]
    NoExercises,

    #[error("inconsistent session state: {0}")]
    Inconsistent(&'static str),
}

//
// ─── EXERCISE STATUS ───────────────────────────────────────────────────────────
//

/// Per-exercise progress.
///
/// - `Locked`: not reached yet, or reached but neither solved nor revealed
/// - `Solved`: a submission matched the expected result
/// - `Skipped`: the solution was revealed before the exercise was solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseStatus {
    #[default]
    Locked,
    Solved,
    Skipped,
}

impl ExerciseStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseStatus::Locked => "locked",
            ExerciseStatus::Solved => "solved",
            ExerciseStatus::Skipped => "skipped",
        }
    }

    /// Solved or skipped.
    #[must_use]
    pub fn is_resolved(self) -> bool {
        !matches!(self, ExerciseStatus::Locked)
    }

    /// Colour hint for progress indicators.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            ExerciseStatus::Locked => "grey",
            ExerciseStatus::Solved => "green",
            ExerciseStatus::Skipped => "orange",
        }
    }
}

/// What a correct submission does to an exercise that was already skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPolicy {
    /// The exercise stays `Skipped`; the session still moves on.
    #[default]
    Sticky,
    /// The exercise becomes `Solved`.
    Upgrade,
}

//
// ─── TRANSITION OUTCOMES ───────────────────────────────────────────────────────
//

/// Effect of grading the current exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Correct; the next exercise is now current.
    Advanced { from: usize, to: usize },
    /// Correct on the last exercise; the session is complete.
    Completed { index: usize },
    /// Not equal to the expected result; nothing changed.
    Incorrect { index: usize },
}

impl Verdict {
    #[must_use]
    pub fn is_correct(self) -> bool {
        !matches!(self, Verdict::Incorrect { .. })
    }
}

/// Effect of revealing the current exercise's solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum RevealEffect {
    Skipped { index: usize },
    AlreadySolved { index: usize },
}

//
// ─── PROGRESS VIEW ─────────────────────────────────────────────────────────────
//

/// Snapshot of the status vector, for rendering a progress indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub statuses: Vec<ExerciseStatus>,
    pub current: usize,
    pub solved: usize,
    pub skipped: usize,
    pub locked: usize,
    pub is_complete: bool,
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// Linear unlock state for one learner session.
///
/// Created once per session; the only way back to all-`Locked` is a new
/// `SessionState`. Only the current exercise can change status, and the
/// current index never moves backwards.
///
/// A deserialized state is checked against the same invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionStateRepr")]
pub struct SessionState {
    statuses: Vec<ExerciseStatus>,
    current: usize,
    drafts: Vec<Option<String>>,
    skip_policy: SkipPolicy,
}

#[derive(Deserialize)]
struct SessionStateRepr {
    statuses: Vec<ExerciseStatus>,
    current: usize,
    drafts: Vec<Option<String>>,
    #[serde(default)]
    skip_policy: SkipPolicy,
}

impl TryFrom<SessionStateRepr> for SessionState {
    type Error = SessionStateError;

    fn try_from(repr: SessionStateRepr) -> Result<Self, Self::Error> {
        let SessionStateRepr {
            statuses,
            current,
            drafts,
            skip_policy,
        } = repr;
        if statuses.is_empty() {
            return Err(SessionStateError::NoExercises);
        }
        if current >= statuses.len() {
            return Err(SessionStateError::Inconsistent(
                "current index is out of range",
            ));
        }
        if drafts.len() != statuses.len() {
            return Err(SessionStateError::Inconsistent(
                "draft count differs from exercise count",
            ));
        }
        if !statuses[..current].iter().all(|s| s.is_resolved()) {
            return Err(SessionStateError::Inconsistent(
                "an exercise before the current one is unresolved",
            ));
        }
        if statuses[current + 1..].iter().any(|s| s.is_resolved()) {
            return Err(SessionStateError::Inconsistent(
                "an exercise after the current one is resolved",
            ));
        }
        Ok(Self {
            statuses,
            current,
            drafts,
            skip_policy,
        })
    }
}

impl SessionState {
    /// # Errors
    ///
    /// Returns `SessionStateError::NoExercises` if `exercise_count` is zero.
    pub fn new(exercise_count: usize) -> Result<Self, SessionStateError> {
        if exercise_count == 0 {
            return Err(SessionStateError::NoExercises);
        }
        Ok(Self {
            statuses: vec![ExerciseStatus::Locked; exercise_count],
            current: 0,
            drafts: vec![None; exercise_count],
            skip_policy: SkipPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_skip_policy(mut self, policy: SkipPolicy) -> Self {
        self.skip_policy = policy;
        self
    }

    #[must_use]
    pub fn skip_policy(&self) -> SkipPolicy {
        self.skip_policy
    }

    #[must_use]
    pub fn exercise_count(&self) -> usize {
        self.statuses.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_status(&self) -> ExerciseStatus {
        self.statuses[self.current]
    }

    #[must_use]
    pub fn status(&self, index: usize) -> Option<ExerciseStatus> {
        self.statuses.get(index).copied()
    }

    #[must_use]
    pub fn statuses(&self) -> &[ExerciseStatus] {
        &self.statuses
    }

    fn is_last(&self) -> bool {
        self.current + 1 == self.statuses.len()
    }

    /// All exercises reached and the last one resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_last() && self.current_status().is_resolved()
    }

    /// Last raw text the learner submitted for `index`.
    #[must_use]
    pub fn draft(&self, index: usize) -> Option<&str> {
        self.drafts.get(index).and_then(Option::as_deref)
    }

    /// Remember the learner's text for the current exercise.
    pub fn save_draft(&mut self, text: impl Into<String>) {
        self.drafts[self.current] = Some(text.into());
    }

    /// Apply the equality check's verdict to the current exercise.
    pub fn record_verdict(&mut self, correct: bool) -> Verdict {
        let index = self.current;
        if !correct {
            return Verdict::Incorrect { index };
        }

        let status = &mut self.statuses[index];
        match (*status, self.skip_policy) {
            (ExerciseStatus::Skipped, SkipPolicy::Sticky) => {}
            _ => *status = ExerciseStatus::Solved,
        }

        if self.is_last() {
            Verdict::Completed { index }
        } else {
            self.current += 1;
            Verdict::Advanced {
                from: index,
                to: self.current,
            }
        }
    }

    /// Mark the current exercise as skipped unless it is already solved.
    pub fn reveal(&mut self) -> RevealEffect {
        let index = self.current;
        let status = &mut self.statuses[index];
        if *status == ExerciseStatus::Solved {
            return RevealEffect::AlreadySolved { index };
        }
        *status = ExerciseStatus::Skipped;
        RevealEffect::Skipped { index }
    }

    #[must_use]
    pub fn progress(&self) -> ProgressView {
        let count = |wanted: ExerciseStatus| self.statuses.iter().filter(|s| **s == wanted).count();
        ProgressView {
            statuses: self.statuses.clone(),
            current: self.current,
            solved: count(ExerciseStatus::Solved),
            skipped: count(ExerciseStatus::Skipped),
            locked: count(ExerciseStatus::Locked),
            is_complete: self.is_complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_session_starts_locked_at_zero() {
        let state = SessionState::new(3).unwrap();
        assert_eq!(state.current_index(), 0);
        assert!(state.statuses().iter().all(|s| *s == ExerciseStatus::Locked));
        assert!(!state.is_complete());
    }

    #[test]
    fn empty_session_is_rejected() {
        assert_eq!(SessionState::new(0).unwrap_err(), SessionStateError::NoExercises);
    }

    #[test]
    fn saved_state_reads_back() {
        let mut state = SessionState::new(3).unwrap();
        state.save_draft("SELECT 1");
        state.record_verdict(true);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(serde_json::from_str::<SessionState>(&json).unwrap(), state);
    }

    #[test]
    fn deserialize_rejects_broken_states() {
        let out_of_range = r#"{"statuses":["locked"],"current":3,"drafts":[null],"skip_policy":"sticky"}"#;
        let err = serde_json::from_str::<SessionState>(out_of_range).unwrap_err();
        assert!(err.to_string().contains("current index is out of range"), "{err}");

        let empty = r#"{"statuses":[],"current":0,"drafts":[]}"#;
        assert!(serde_json::from_str::<SessionState>(empty).is_err());

        let short_drafts = r#"{"statuses":["locked","locked"],"current":0,"drafts":[null]}"#;
        assert!(serde_json::from_str::<SessionState>(short_drafts).is_err());

        let gap = r#"{"statuses":["locked","locked"],"current":1,"drafts":[null,null]}"#;
        assert!(serde_json::from_str::<SessionState>(gap).is_err());

        let ahead = r#"{"statuses":["locked","solved"],"current":0,"drafts":[null,null]}"#;
        assert!(serde_json::from_str::<SessionState>(ahead).is_err());
    }

    #[test]
    fn correct_verdict_solves_and_advances() {
        let mut state = SessionState::new(2).unwrap();
        assert_eq!(state.record_verdict(true), Verdict::Advanced { from: 0, to: 1 });
        assert_eq!(state.status(0), Some(ExerciseStatus::Solved));
        assert_eq!(state.current_index(), 1);
    }

    #[test]
    fn incorrect_verdict_changes_nothing() {
        let mut state = SessionState::new(2).unwrap();
        let before = state.clone();
        assert_eq!(state.record_verdict(false), Verdict::Incorrect { index: 0 });
        assert_eq!(state, before);
    }

    #[test]
    fn last_exercise_completes_without_advancing() {
        let mut state = SessionState::new(1).unwrap();
        assert_eq!(state.record_verdict(true), Verdict::Completed { index: 0 });
        assert_eq!(state.current_index(), 0);
        assert!(state.is_complete());
    }

    #[test]
    fn reveal_skips_without_advancing() {
        let mut state = SessionState::new(4).unwrap();
        state.record_verdict(true);
        state.record_verdict(true);
        assert_eq!(state.reveal(), RevealEffect::Skipped { index: 2 });
        assert_eq!(state.status(2), Some(ExerciseStatus::Skipped));
        assert_eq!(state.current_index(), 2);
    }

    #[test]
    fn solved_is_sticky_against_reveal() {
        let mut state = SessionState::new(1).unwrap();
        state.record_verdict(true);
        assert_eq!(state.reveal(), RevealEffect::AlreadySolved { index: 0 });
        assert_eq!(state.status(0), Some(ExerciseStatus::Solved));
    }

    #[test]
    fn sticky_skip_survives_correct_submission_but_advances() {
        let mut state = SessionState::new(2).unwrap();
        state.reveal();
        assert_eq!(state.record_verdict(true), Verdict::Advanced { from: 0, to: 1 });
        assert_eq!(state.status(0), Some(ExerciseStatus::Skipped));
    }

    #[test]
    fn upgrade_policy_turns_skip_into_solved() {
        let mut state = SessionState::new(2).unwrap().with_skip_policy(SkipPolicy::Upgrade);
        state.reveal();
        state.record_verdict(true);
        assert_eq!(state.status(0), Some(ExerciseStatus::Solved));
    }

    #[test]
    fn revealing_last_exercise_completes_session() {
        let mut state = SessionState::new(1).unwrap();
        state.reveal();
        assert!(state.is_complete());
        let progress = state.progress();
        assert_eq!(progress.skipped, 1);
        assert!(progress.is_complete);
    }

    #[test]
    fn drafts_are_kept_per_exercise() {
        let mut state = SessionState::new(2).unwrap();
        state.save_draft("SELECT 1");
        state.record_verdict(true);
        state.save_draft("SELECT 2");
        assert_eq!(state.draft(0), Some("SELECT 1"));
        assert_eq!(state.draft(1), Some("SELECT 2"));
        assert_eq!(state.draft(5), None);
    }

    #[derive(Debug, Clone, Copy)]
    enum Event {
        Submit(bool),
        Reveal,
    }

    fn arb_event() -> impl Strategy<Value = Event> {
        prop_oneof![any::<bool>().prop_map(Event::Submit), Just(Event::Reveal)]
    }

    proptest! {
        #[test]
        fn prop_index_is_monotonic_and_bounded(
            count in 1usize..8,
            events in prop::collection::vec(arb_event(), 0..40),
        ) {
            let mut state = SessionState::new(count).unwrap();
            for event in events {
                let before = state.clone();
                match event {
                    Event::Submit(correct) => { state.record_verdict(correct); }
                    Event::Reveal => { state.reveal(); }
                }
                prop_assert!(state.current_index() >= before.current_index());
                prop_assert!(state.current_index() < count);
                for (idx, status) in before.statuses().iter().enumerate() {
                    if status.is_resolved() {
                        prop_assert!(state.statuses()[idx].is_resolved());
                    }
                    if idx != before.current_index() {
                        prop_assert_eq!(state.statuses()[idx], *status);
                    }
                }
                for idx in state.current_index() + 1..count {
                    prop_assert_eq!(state.statuses()[idx], ExerciseStatus::Locked);
                }
            }
        }
    }
}

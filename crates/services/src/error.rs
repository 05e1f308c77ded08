//! Shared error types for the services crate.

use thiserror::Error;

use drill_core::model::{ExerciseError, ExerciseId, SessionStateError};
use storage::RunnerFault;

/// Errors emitted by practice session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("no exercises available for session")]
    Empty,
    #[error("canonical solution for exercise {exercise} failed: {fault}")]
    Solution {
        exercise: ExerciseId,
        #[source]
        fault: RunnerFault,
    },
    #[error(transparent)]
    Exercise(#[from] ExerciseError),
    #[error(transparent)]
    State(#[from] SessionStateError),
}

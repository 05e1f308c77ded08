mod exercise;
mod ids;
mod session;
mod table;
mod value;

pub use ids::{ExerciseId, ParseIdError};

pub use exercise::{Exercise, ExerciseError, Solution};
pub use session::{
    ExerciseStatus, ProgressView, RevealEffect, SessionState, SessionStateError, SkipPolicy,
    Verdict,
};
pub use table::{Column, TableError, TabularResult};
pub use value::{ColumnKind, Value};

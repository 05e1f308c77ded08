#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod practice;

pub use drill_core::Clock;

pub use error::PracticeError;
pub use practice::{
    AttemptKind, AttemptRecord, PracticeLoopService, PracticeSession, PracticeSummary,
    RevealOutcome, SubmitOutcome,
};

#![forbid(unsafe_code)]

//! Grading core for SQL practice sessions.
//!
//! Everything here is pure and synchronous: result normalization, the
//! equality check built on it, and the linear progression state machine.

pub mod grading;
pub mod model;
pub mod normalize;
pub mod policy;
pub mod submission;
pub mod time;

pub use grading::{ComparisonFault, result_equals};
pub use normalize::{CanonicalResult, GradingOptions, normalize};
pub use policy::{PolicyViolation, RetrievalOnly, StatementPolicy, single_statement};
pub use submission::{Capabilities, Submission, SubmissionError};
pub use time::Clock;

mod outcome;
mod service;
mod workflow;

pub use outcome::{AttemptKind, AttemptRecord, PracticeSummary, RevealOutcome, SubmitOutcome};
pub use service::PracticeSession;
pub use workflow::PracticeLoopService;

#![forbid(unsafe_code)]

pub mod delimited;
pub mod runner;
pub mod sqlite;

pub use delimited::{CsvError, parse_csv, relation_name, write_csv};
pub use runner::{InMemoryRunner, QueryRunner, RunnerFault};
pub use sqlite::{SqliteInitError, SqliteRunner, StatementOutcome};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use drill_core::model::SkipPolicy;
use drill_core::{RetrievalOnly, StatementPolicy};
use services::catalog::books_and_movies;
use services::{Clock, PracticeLoopService, PracticeSession};
use storage::{QueryRunner, SqliteRunner, parse_csv, relation_name, write_csv};
use storage::sqlite::sample::BOOKS_AND_MOVIES;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod render;

use render::Output;

#[derive(Debug)]
enum ArgsError {
    InvalidDbUrl { raw: String },
    MissingRelation,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingRelation => write!(f, "--relation is required unless --csv is given"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// Practice SQL retrieval queries against a sample database.
#[derive(Debug, Parser)]
#[command(name = "drill", version)]
struct Cli {
    /// SQLite database URL or path.
    #[arg(long, env = "DRILL_DB_URL", default_value = "sqlite::memory:", global = true)]
    db: String,

    /// Schema and data script to load instead of the bundled Books & Movies dataset.
    #[arg(long, env = "DRILL_SCRIPT", value_name = "FILE", global = true)]
    script: Option<PathBuf>,

    /// CSV file to load as an extra table after the dataset.
    #[arg(long, env = "DRILL_CSV", value_name = "FILE", global = true)]
    csv: Option<PathBuf>,

    /// Table name for `--csv` (defaults to the file name without extension).
    #[arg(long, value_name = "NAME", global = true)]
    csv_table: Option<String>,

    /// Print every result as a JSON line.
    #[arg(long, global = true)]
    json: bool,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Work through the exercises in order (default).
    Practice {
        /// What a correct answer does to an exercise whose solution was revealed.
        #[arg(long, value_enum, default_value_t = SkipMode::Sticky)]
        skip: SkipMode,
    },
    /// Run statements against the database outside grading.
    Console {
        /// Run this statement and exit instead of reading stdin.
        sql: Option<String>,
    },
    /// List the exercise catalogue.
    Exercises,
    /// Show the first rows of every table.
    Preview {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Show column names and types of one table, or of every table.
    Schema { relation: Option<String> },
    /// Run one retrieval query and print (or save) its result.
    Query {
        sql: String,
        /// Backing table the query is checked against (defaults to the `--csv` table).
        #[arg(long)]
        relation: Option<String>,
        /// Also write the result to this CSV file.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SkipMode {
    /// Revealed exercises stay skipped.
    Sticky,
    /// A later correct answer marks them solved.
    Upgrade,
}

impl From<SkipMode> for SkipPolicy {
    fn from(mode: SkipMode) -> Self {
        match mode {
            SkipMode::Sticky => SkipPolicy::Sticky,
            SkipMode::Upgrade => SkipPolicy::Upgrade,
        }
    }
}

const PRACTICE_HELP: &str = "\
End a query with `;` or an empty line to submit it.
  :reveal    show the solution (marks the exercise skipped)
  :progress  show progress
  :draft     show your last attempt
  :help      show this help
  :quit      leave the session";

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Connect and load the dataset; every run starts from a fresh copy.
///
/// Returns the runner and the name of the table loaded from `--csv`, if any.
async fn open_database(
    cli: &Cli,
) -> Result<(SqliteRunner, Option<String>), Box<dyn std::error::Error>> {
    if cli.db.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: cli.db.clone() }.into());
    }
    let db_url = normalize_sqlite_url(cli.db.clone());
    prepare_sqlite_file(&db_url)?;
    let runner = SqliteRunner::connect(&db_url).await?;

    let script = match &cli.script {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => BOOKS_AND_MOVIES.to_owned(),
    };
    runner.reset(&script).await?;

    let Some(path) = &cli.csv else {
        return Ok((runner, None));
    };
    let name = cli.csv_table.clone().unwrap_or_else(|| csv_table_name(path));
    let table = parse_csv(&tokio::fs::read(path).await?)?;
    runner.load_table(&name, &table).await?;
    Ok((runner, Some(name)))
}

fn csv_table_name(path: &std::path::Path) -> String {
    relation_name(&path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default())
}

/// Collects stdin lines into statements ended by `;` or a blank line.
struct StatementReader<R> {
    lines: tokio::io::Lines<BufReader<R>>,
}

enum Input {
    Meta(String),
    Statement(String),
}

impl<R: tokio::io::AsyncRead + Unpin> StatementReader<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    async fn next(&mut self) -> std::io::Result<Option<Input>> {
        let mut buffer = String::new();
        while let Some(line) = self.lines.next_line().await? {
            let trimmed = line.trim();
            if buffer.is_empty() {
                if let Some(meta) = trimmed.strip_prefix(':') {
                    return Ok(Some(Input::Meta(meta.trim().to_lowercase())));
                }
                if trimmed.is_empty() {
                    continue;
                }
            } else if trimmed.is_empty() {
                return Ok(Some(Input::Statement(buffer)));
            }

            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(&line);
            if trimmed.ends_with(';') {
                return Ok(Some(Input::Statement(buffer)));
            }
        }
        Ok((!buffer.trim().is_empty()).then_some(Input::Statement(buffer)))
    }
}

async fn practice(
    runner: SqliteRunner,
    skip: SkipPolicy,
    out: &Output,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = PracticeLoopService::new(Clock::system(), Arc::new(runner)).with_skip_policy(skip);
    let mut session = service.start_session(books_and_movies()?).await?;

    out.exercise(&session);
    let mut input = StatementReader::new(tokio::io::stdin());
    while let Some(item) = input.next().await? {
        match item {
            Input::Meta(cmd) => match cmd.as_str() {
                "reveal" => {
                    let reveal = service.reveal(&mut session);
                    out.reveal(&reveal);
                    if finish(&session, out) {
                        return Ok(());
                    }
                }
                "progress" => out.progress(&session.progress()),
                "draft" => match session.current_draft() {
                    Some(draft) => println!("{draft}"),
                    None => println!("No attempt yet."),
                },
                "help" => println!("{PRACTICE_HELP}"),
                "quit" | "q" => return Ok(()),
                other => out.error(&format!("unknown command :{other} (try :help)")),
            },
            Input::Statement(text) => {
                let outcome = service.submit(&mut session, &text).await;
                out.outcome(&outcome);
                if finish(&session, out) {
                    return Ok(());
                }
                if outcome.is_correct() {
                    out.exercise(&session);
                }
            }
        }
    }
    Ok(())
}

/// Print the summary once the session is complete.
fn finish(session: &PracticeSession, out: &Output) -> bool {
    match session.summary() {
        Some(summary) => {
            out.summary(&summary);
            true
        }
        None => false,
    }
}

async fn console(
    runner: &SqliteRunner,
    sql: Option<String>,
    out: &Output,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(sql) = sql {
        out.statement(&runner.execute(&sql).await?);
        return Ok(());
    }

    let mut input = StatementReader::new(tokio::io::stdin());
    while let Some(item) = input.next().await? {
        match item {
            Input::Meta(cmd) if cmd == "quit" || cmd == "q" => break,
            Input::Meta(cmd) => out.error(&format!("unknown command :{cmd}")),
            Input::Statement(sql) => match runner.execute(&sql).await {
                Ok(outcome) => out.statement(&outcome),
                Err(fault) => out.error(&fault.to_string()),
            },
        }
    }
    Ok(())
}

async fn preview(
    runner: &SqliteRunner,
    limit: u32,
    out: &Output,
) -> Result<(), Box<dyn std::error::Error>> {
    for relation in runner.relations().await? {
        if !out.is_json() {
            println!("{relation}");
        }
        let sql = format!("SELECT * FROM \"{}\" LIMIT {limit}", relation.replace('"', "\"\""));
        out.statement(&runner.execute(&sql).await?);
    }
    Ok(())
}

async fn schema(
    runner: &SqliteRunner,
    relation: Option<String>,
    out: &Output,
) -> Result<(), Box<dyn std::error::Error>> {
    let relations = match relation {
        Some(relation) => vec![relation],
        None => runner.relations().await?,
    };
    for relation in relations {
        if !out.is_json() {
            println!("{relation}");
        }
        out.table(&runner.schema(&relation).await?);
    }
    Ok(())
}

async fn query(
    runner: &SqliteRunner,
    sql: &str,
    relation: &str,
    output: Option<PathBuf>,
    out: &Output,
) -> Result<(), Box<dyn std::error::Error>> {
    RetrievalOnly::default().check(sql)?;
    let result = runner.run(sql, relation).await?;
    out.table(&result);

    if let Some(path) = output {
        write_csv(&result, std::fs::File::create(&path)?)?;
        tracing::info!(path = %path.display(), rows = result.row_count(), "result saved");
        if !out.is_json() {
            println!("Saved {} row(s) to {}", result.row_count(), path.display());
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();
    init_tracing(&cli.log_level);
    let out = Output::new(cli.json);

    let command = cli.command.take().unwrap_or(Command::Practice {
        skip: SkipMode::Sticky,
    });
    if let Command::Exercises = command {
        out.exercises(&books_and_movies()?);
        return Ok(());
    }

    let (runner, csv_relation) = open_database(&cli).await?;
    match command {
        Command::Practice { skip } => practice(runner, skip.into(), &out).await,
        Command::Console { sql } => console(&runner, sql, &out).await,
        Command::Preview { limit } => preview(&runner, limit, &out).await,
        Command::Schema { relation } => schema(&runner, relation, &out).await,
        Command::Query {
            sql,
            relation,
            output,
        } => {
            let relation = relation.or(csv_relation).ok_or(ArgsError::MissingRelation)?;
            query(&runner, &sql, &relation, output, &out).await
        }
        Command::Exercises => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_url_is_kept() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }

    #[test]
    fn relative_path_becomes_absolute_url() {
        let url = normalize_sqlite_url("sqlite:drill.sqlite3".into());
        assert!(url.starts_with("sqlite:///"), "{url}");
        assert!(url.ends_with("drill.sqlite3"));
    }

    #[test]
    fn cli_defaults_to_memory_database() {
        let cli = Cli::parse_from(["drill", "console", "SELECT 1;"]);
        assert_eq!(cli.db, "sqlite::memory:");
        assert!(matches!(cli.command, Some(Command::Console { sql: Some(_) })));
    }

    #[test]
    fn csv_flags_and_query_command_parse() {
        let cli = Cli::parse_from([
            "drill",
            "--csv",
            "data/2024 sales.csv",
            "query",
            "SELECT * FROM t_2024_sales",
            "--output",
            "out.csv",
        ]);
        assert_eq!(csv_table_name(cli.csv.as_deref().unwrap()), "t_2024_sales");
        assert!(matches!(
            cli.command,
            Some(Command::Query { relation: None, output: Some(_), .. })
        ));
    }

    #[test]
    fn schema_relation_is_optional() {
        let cli = Cli::parse_from(["drill", "schema"]);
        assert!(matches!(cli.command, Some(Command::Schema { relation: None })));
    }

    #[tokio::test]
    async fn reader_splits_statements_and_meta_commands() {
        let text = b":progress\nSELECT title\nFROM books;\n\nSELECT 1\n\n:quit\nSELECT 2" as &[u8];
        let mut reader = StatementReader::new(text);

        assert!(matches!(reader.next().await.unwrap(), Some(Input::Meta(m)) if m == "progress"));
        assert!(
            matches!(reader.next().await.unwrap(), Some(Input::Statement(s)) if s == "SELECT title\nFROM books;")
        );
        assert!(matches!(reader.next().await.unwrap(), Some(Input::Statement(s)) if s == "SELECT 1"));
        assert!(matches!(reader.next().await.unwrap(), Some(Input::Meta(m)) if m == "quit"));
        assert!(matches!(reader.next().await.unwrap(), Some(Input::Statement(s)) if s == "SELECT 2"));
        assert!(reader.next().await.unwrap().is_none());
    }
}

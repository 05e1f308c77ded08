//! Learner submissions: plain SQL, or a call expression wrapping SQL.
//!
//! Call expressions such as `sqldf("SELECT ...")` are never evaluated. They
//! are parsed against a fixed set of allowed callables and unwrapped to the
//! query string they carry.

use thiserror::Error;

use crate::policy::{PolicyViolation, leading_word};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("`{0}` is not an allowed function; only {1} may be called")]
    UnknownCallable(String, String),

    #[error("`{0}(...)` takes a single string literal")]
    ExpectedStringLiteral(String),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("formatted string literals are not allowed")]
    FormattedString,

    #[error("unexpected text after the call: `{0}`")]
    TrailingInput(String),
}

impl From<SubmissionError> for PolicyViolation {
    fn from(e: SubmissionError) -> Self {
        PolicyViolation::new(e.to_string())
    }
}

/// Names a submission may call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    callables: Vec<String>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new(["sqldf", "pysqldf"])
    }
}

impl Capabilities {
    #[must_use]
    pub fn new<S: Into<String>>(callables: impl IntoIterator<Item = S>) -> Self {
        Self {
            callables: callables.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        self.callables.iter().any(|c| c == name)
    }

    fn describe(&self) -> String {
        self.callables
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Words that open SQL statements; a call-shaped text starting with one is SQL.
const SQL_LEADERS: &[&str] = &[
    "select", "with", "values", "pragma", "explain", "insert", "update", "delete", "create",
    "drop", "alter", "replace",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Sql(String),
    Invocation { callable: String, sql: String },
}

impl Submission {
    /// Classify and unwrap `text`.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` when `text` is call-shaped but names a
    /// callable outside `caps`, or its argument is not a plain string literal.
    pub fn parse(text: &str, caps: &Capabilities) -> Result<Self, SubmissionError> {
        let trimmed = text.trim();
        let Some((name, args)) = split_call(trimmed) else {
            return Ok(Self::Sql(trimmed.to_owned()));
        };

        if !caps.allows(name) {
            if SQL_LEADERS.iter().any(|w| w.eq_ignore_ascii_case(name)) {
                return Ok(Self::Sql(trimmed.to_owned()));
            }
            return Err(SubmissionError::UnknownCallable(name.to_owned(), caps.describe()));
        }

        let sql = parse_arguments(name, args)?;
        Ok(Self::Invocation {
            callable: name.to_owned(),
            sql,
        })
    }

    /// The SQL that should be run.
    #[must_use]
    pub fn sql(&self) -> &str {
        match self {
            Submission::Sql(sql) | Submission::Invocation { sql, .. } => sql,
        }
    }
}

/// `name(args)` → (`name`, text after the opening parenthesis).
fn split_call(text: &str) -> Option<(&str, &str)> {
    let name = leading_word(text)?;
    if !text.starts_with(name) || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let rest = text[name.len()..].trim_start();
    let args = rest.strip_prefix('(')?;
    Some((name, args))
}

fn parse_arguments(name: &str, args: &str) -> Result<String, SubmissionError> {
    let mut rest = args.trim_start();
    let mut sql = String::new();
    let mut literals = 0;

    // Adjacent literals concatenate.
    while let Some((text, tail)) = parse_literal(rest)? {
        sql.push_str(&text);
        literals += 1;
        rest = tail.trim_start();
    }
    if literals == 0 {
        return Err(SubmissionError::ExpectedStringLiteral(name.to_owned()));
    }

    if let Some(tail) = rest.strip_prefix(',') {
        let tail = tail.trim_start();
        rest = ["globals()", "locals()"]
            .iter()
            .find_map(|scope| tail.strip_prefix(scope))
            .ok_or_else(|| SubmissionError::ExpectedStringLiteral(name.to_owned()))?
            .trim_start();
    }

    let rest = rest
        .strip_prefix(')')
        .ok_or_else(|| SubmissionError::TrailingInput(rest.to_owned()))?;
    let rest = rest.trim().trim_end_matches(';').trim();
    if !rest.is_empty() {
        return Err(SubmissionError::TrailingInput(rest.to_owned()));
    }
    Ok(sql)
}

/// Parse one string literal at the start of `input`.
fn parse_literal(input: &str) -> Result<Option<(String, &str)>, SubmissionError> {
    let mut body = input;
    let mut raw = false;
    if let Some(prefix) = body.chars().next().filter(char::is_ascii_alphabetic) {
        match prefix.to_ascii_lowercase() {
            'r' => raw = true,
            'f' => return Err(SubmissionError::FormattedString),
            _ => return Ok(None),
        }
        body = &body[1..];
    }

    let quote = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|q| body.starts_with(q));
    let Some(quote) = quote else {
        return Ok(None);
    };
    body = &body[quote.len()..];

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        if body[idx..].starts_with(quote) {
            return Ok(Some((out, &body[idx + quote.len()..])));
        }
        if c == '\\' && !raw {
            let Some((_, escaped)) = chars.next() else {
                break;
            };
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                '\n' => {}
                other => out.push(other),
            }
            continue;
        }
        if c == '\n' && quote.len() == 1 {
            break;
        }
        out.push(c);
    }
    Err(SubmissionError::UnterminatedString)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Submission, SubmissionError> {
        Submission::parse(text, &Capabilities::default())
    }

    #[test]
    fn plain_sql_passes_through() {
        let sub = parse("  SELECT species FROM penguins  ").unwrap();
        assert_eq!(sub, Submission::Sql("SELECT species FROM penguins".into()));
    }

    #[test]
    fn sql_with_parenthesis_is_still_sql() {
        let sub = parse("select(1)").unwrap();
        assert_eq!(sub.sql(), "select(1)");
    }

    #[test]
    fn allowed_call_is_unwrapped() {
        let sub = parse(r#"sqldf("SELECT DISTINCT species FROM penguins");"#).unwrap();
        assert_eq!(
            sub,
            Submission::Invocation {
                callable: "sqldf".into(),
                sql: "SELECT DISTINCT species FROM penguins".into(),
            }
        );
    }

    #[test]
    fn scope_argument_and_triple_quotes_are_accepted() {
        let sub = parse("pysqldf('''SELECT *\nFROM t''', globals())").unwrap();
        assert_eq!(sub.sql(), "SELECT *\nFROM t");
    }

    #[test]
    fn adjacent_literals_concatenate_and_escapes_decode() {
        let sub = parse(r#"sqldf("SELECT 'a\'b' " 'FROM t')"#).unwrap();
        assert_eq!(sub.sql(), "SELECT 'a'b' FROM t");
    }

    #[test]
    fn unknown_callable_is_refused() {
        let err = parse(r#"__import__("os").system("rm -rf /")"#).unwrap_err();
        assert!(matches!(err, SubmissionError::UnknownCallable(name, _) if name == "__import__"));
    }

    #[test]
    fn non_literal_argument_is_refused() {
        let err = parse("sqldf(open('/etc/passwd').read())").unwrap_err();
        assert_eq!(err, SubmissionError::ExpectedStringLiteral("sqldf".into()));
    }

    #[test]
    fn chained_call_is_refused() {
        let err = parse(r#"sqldf("SELECT 1").to_csv("x")"#).unwrap_err();
        assert!(matches!(err, SubmissionError::TrailingInput(_)));
    }

    #[test]
    fn formatted_strings_are_refused() {
        assert_eq!(parse(r#"sqldf(f"SELECT {x}")"#).unwrap_err(), SubmissionError::FormattedString);
    }

    #[test]
    fn unterminated_literal_is_refused() {
        assert_eq!(parse(r#"sqldf("SELECT 1)"#).unwrap_err(), SubmissionError::UnterminatedString);
    }

    #[test]
    fn refusal_converts_to_policy_violation() {
        let violation: PolicyViolation = parse("eval('1')").unwrap_err().into();
        assert!(violation.message().contains("eval"));
    }
}

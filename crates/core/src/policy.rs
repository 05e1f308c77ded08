use thiserror::Error;

/// A submission refused before it reaches the query runner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PolicyViolation {
    message: String,
}

impl PolicyViolation {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Hook that decides whether a statement may be run for grading.
pub trait StatementPolicy: Send + Sync {
    /// # Errors
    ///
    /// Returns `PolicyViolation` with a learner-facing message if `sql` is refused.
    fn check(&self, sql: &str) -> Result<(), PolicyViolation>;
}

/// Accepts only statements that begin with a retrieval keyword.
///
/// Matching is case-insensitive, ignores surrounding whitespace and leading
/// SQL comments, and requires a word boundary after the keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalOnly {
    keywords: Vec<String>,
}

impl Default for RetrievalOnly {
    fn default() -> Self {
        Self::new(["SELECT", "WITH"])
    }
}

impl RetrievalOnly {
    #[must_use]
    pub fn new<S: Into<String>>(keywords: impl IntoIterator<Item = S>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_ascii_uppercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Whether `sql` starts with one of the configured keywords.
    #[must_use]
    pub fn allows(&self, sql: &str) -> bool {
        let Some(word) = leading_word(sql) else {
            return false;
        };
        self.keywords.iter().any(|k| k.eq_ignore_ascii_case(word))
    }
}

impl StatementPolicy for RetrievalOnly {
    fn check(&self, sql: &str) -> Result<(), PolicyViolation> {
        if strip_leading_comments(sql).is_empty() {
            return Err(PolicyViolation::new("The query is empty."));
        }
        if !self.allows(sql) {
            return Err(PolicyViolation::new(format!(
                "Only {} queries are allowed.",
                self.keywords.join(" or ")
            )));
        }
        if single_statement(sql).is_none() {
            return Err(PolicyViolation::new("Only one statement can be run at a time."));
        }
        Ok(())
    }
}

/// The only statement in `sql`, trimmed and without its `;`.
///
/// `None` when anything but whitespace or comments follows the first `;`.
#[must_use]
pub fn single_statement(sql: &str) -> Option<&str> {
    let (first, rest) = split_first_statement(sql);
    strip_leading_comments(rest).is_empty().then(|| first.trim())
}

/// Split `sql` at its first `;` outside quotes, brackets and comments.
///
/// Returns the text before the separator and the text after it; the second
/// half is empty when there is no separator.
#[must_use]
pub fn split_first_statement(sql: &str) -> (&str, &str) {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        i = match bytes[i] {
            b';' => return (&sql[..i], &sql[i + 1..]),
            quote @ (b'\'' | b'"' | b'`') => skip_quoted(bytes, i + 1, quote),
            b'[' => skip_past(bytes, i + 1, b"]"),
            b'-' if bytes.get(i + 1) == Some(&b'-') => skip_past(bytes, i + 2, b"\n"),
            b'/' if bytes.get(i + 1) == Some(&b'*') => skip_past(bytes, i + 2, b"*/"),
            _ => i + 1,
        };
    }
    (sql, "")
}

/// Index just past the closing `quote`; a doubled quote is an escape.
fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) != Some(&quote) {
                return i + 1;
            }
            i += 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_past(bytes: &[u8], from: usize, end: &[u8]) -> usize {
    bytes
        .get(from..)
        .and_then(|tail| tail.windows(end.len()).position(|w| w == end))
        .map_or(bytes.len(), |at| from + at + end.len())
}

/// First word of `sql` once whitespace and comments are skipped.
#[must_use]
pub fn leading_word(sql: &str) -> Option<&str> {
    let rest = strip_leading_comments(sql);
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(line) = rest.strip_prefix("--") {
            rest = line.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(block) = rest.strip_prefix("/*") {
            rest = block.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            return rest.trim_end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_and_with_are_allowed() {
        let policy = RetrievalOnly::default();
        assert!(policy.check("  select * from penguins ").is_ok());
        assert!(policy.check("WITH t AS (SELECT 1) SELECT * FROM t").is_ok());
        assert!(policy.check("Select\n1").is_ok());
    }

    #[test]
    fn mutations_are_refused() {
        let policy = RetrievalOnly::default();
        let err = policy.check("UPDATE penguins SET species='x'").unwrap_err();
        assert_eq!(err.message(), "Only SELECT or WITH queries are allowed.");
        assert!(policy.check("DELETE FROM penguins").is_err());
        assert!(policy.check("DROP TABLE penguins").is_err());
    }

    #[test]
    fn keyword_needs_word_boundary() {
        let policy = RetrievalOnly::default();
        assert!(policy.check("selectx FROM t").is_err());
        assert!(policy.check("select_all()").is_err());
    }

    #[test]
    fn leading_comments_are_skipped() {
        let policy = RetrievalOnly::default();
        assert!(policy.check("-- full join\n/* note */ WITH a AS (SELECT 1) SELECT * FROM a").is_ok());
        assert!(policy.check("-- only a comment").is_err());
    }

    #[test]
    fn empty_text_is_refused() {
        let err = RetrievalOnly::default().check("   ").unwrap_err();
        assert_eq!(err.message(), "The query is empty.");
    }

    #[test]
    fn stacked_statements_are_refused() {
        let policy = RetrievalOnly::default();
        let err = policy
            .check("SELECT 1; PRAGMA query_only = OFF; DELETE FROM movies;")
            .unwrap_err();
        assert_eq!(err.message(), "Only one statement can be run at a time.");
        assert!(policy.check("SELECT 1;\n  -- done\n").is_ok());
        assert!(policy.check("SELECT 1 /* a; b */ ;").is_ok());
    }

    #[test]
    fn separator_inside_literals_and_comments_is_ignored() {
        assert_eq!(
            split_first_statement("SELECT 'a;b', \"c;\", [d;] -- e;\nFROM t; DELETE FROM t"),
            ("SELECT 'a;b', \"c;\", [d;] -- e;\nFROM t", " DELETE FROM t")
        );
        assert_eq!(split_first_statement("SELECT 'it''s; fine'"), ("SELECT 'it''s; fine'", ""));
        assert_eq!(single_statement("  SELECT 1 ;  "), Some("SELECT 1"));
        assert_eq!(single_statement("SELECT 1; SELECT 2"), None);
    }

    #[test]
    fn custom_keywords_are_respected() {
        let policy = RetrievalOnly::new(["select", "pragma"]);
        assert!(policy.check("PRAGMA table_info(books)").is_ok());
        assert!(policy.check("WITH t AS (SELECT 1) SELECT 1").is_err());
    }
}

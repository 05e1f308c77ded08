/// Drop MySQL-only `SET FOREIGN_KEY_CHECKS = n;` statements from a script.
///
/// Everything else is passed through byte for byte.
#[must_use]
pub fn strip_mysql_statements(script: &str) -> String {
    script
        .split_inclusive(';')
        .filter(|stmt| !is_foreign_key_checks(stmt))
        .collect()
}

fn is_foreign_key_checks(stmt: &str) -> bool {
    let compact: String = stmt
        .trim()
        .trim_end_matches(';')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let Some(value) = compact
        .to_ascii_uppercase()
        .strip_prefix("SETFOREIGN_KEY_CHECKS=")
        .map(str::to_owned)
    else {
        return false;
    };
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_key_checks_are_removed() {
        let script = "SET FOREIGN_KEY_CHECKS = 0;\nCREATE TABLE a (id INTEGER);\nset foreign_key_checks=1;\n";
        assert_eq!(strip_mysql_statements(script), "\nCREATE TABLE a (id INTEGER);\n");
    }

    #[test]
    fn other_statements_are_untouched() {
        let script = "INSERT INTO t VALUES ('SET FOREIGN_KEY_CHECKS = 0;');";
        assert_eq!(strip_mysql_statements(script), script);
    }
}

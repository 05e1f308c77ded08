//! Terminal display sink: tables, exercise prompts, progress and outcomes.
//!
//! With `--json` every item is printed as one JSON document per line instead.

use std::io::IsTerminal;

use drill_core::model::{Exercise, ExerciseStatus, ProgressView, RevealEffect, TabularResult};
use prettytable::{Cell, Row, Table, format};
use serde::Serialize;
use services::{PracticeSession, PracticeSummary, RevealOutcome, SubmitOutcome};
use storage::StatementOutcome;

pub struct Output {
    json: bool,
    colour: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            colour: !json && std::io::stdout().is_terminal(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    fn emit_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::error!(%err, "could not encode output"),
        }
    }

    pub fn table(&self, result: &TabularResult) {
        if self.json {
            self.emit_json(result);
            return;
        }
        println!("{}", table_text(result));
    }

    pub fn statement(&self, outcome: &StatementOutcome) {
        match outcome {
            StatementOutcome::Rows(rows) => self.table(rows),
            StatementOutcome::Affected(n) if self.json => {
                self.emit_json(&serde_json::json!({ "affected": n }));
            }
            StatementOutcome::Affected(n) => println!("{}", StatementOutcome::affected_message(*n)),
        }
    }

    pub fn error(&self, message: &str) {
        if self.json {
            self.emit_json(&serde_json::json!({ "error": message }));
        } else {
            println!("{message}");
        }
    }

    pub fn exercises(&self, exercises: &[Exercise]) {
        if self.json {
            let listing: Vec<_> = exercises.iter().map(exercise_json).collect();
            self.emit_json(&listing);
            return;
        }
        for exercise in exercises {
            println!("{:>2}. [{}] {}", exercise.id(), exercise.relation(), exercise.prompt());
        }
    }

    pub fn exercise(&self, session: &PracticeSession) {
        let exercise = session.current_exercise();
        if self.json {
            self.emit_json(&serde_json::json!({
                "index": session.current_index(),
                "exercise": exercise_json(exercise),
                "draft": session.current_draft(),
            }));
            return;
        }
        self.progress(&session.progress());
        println!(
            "\nExercise {} of {}: {}",
            session.current_index() + 1,
            session.exercises().len(),
            exercise.title()
        );
        println!("{}", exercise.prompt());
        if let Some(draft) = session.current_draft() {
            println!("Last attempt:\n{draft}");
        }
    }

    pub fn progress(&self, progress: &ProgressView) {
        if self.json {
            self.emit_json(progress);
            return;
        }
        let cells: Vec<String> = progress
            .statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mark = if i == progress.current { '>' } else { marker(*status) };
                self.paint(&format!("{}{mark}", i + 1), *status)
            })
            .collect();
        println!(
            "{}  ({} solved, {} skipped, {} locked)",
            cells.join(" "),
            progress.solved,
            progress.skipped,
            progress.locked
        );
    }

    pub fn outcome(&self, outcome: &SubmitOutcome) {
        if self.json {
            self.emit_json(outcome);
            return;
        }
        println!("{}", outcome.message());
        match outcome {
            SubmitOutcome::Correct { result, .. } => println!("{}", table_text(result.as_table())),
            SubmitOutcome::Incorrect { result, expected, .. } => {
                println!("Your result:\n{}", table_text(result));
                println!("Expected result:\n{}", table_text(expected));
            }
            SubmitOutcome::Rejected { .. } | SubmitOutcome::Failed { .. } => {}
        }
    }

    pub fn reveal(&self, reveal: &RevealOutcome) {
        if self.json {
            self.emit_json(reveal);
            return;
        }
        match reveal.effect {
            RevealEffect::Skipped { .. } => println!("Solution (exercise marked as skipped):"),
            RevealEffect::AlreadySolved { .. } => println!("Solution:"),
        }
        println!("{}", reveal.solution.display_text());
        println!("Expected result:\n{}", table_text(&reveal.expected));
    }

    pub fn summary(&self, summary: &PracticeSummary) {
        if self.json {
            self.emit_json(summary);
            return;
        }
        let minutes = (summary.completed_at - summary.started_at).num_minutes();
        println!(
            "\nAll {} exercises done: {} solved, {} skipped, {} attempts ({} incorrect) in {minutes} min.",
            summary.total, summary.solved, summary.skipped, summary.attempts, summary.incorrect
        );
    }

    fn paint(&self, text: &str, status: ExerciseStatus) -> String {
        if !self.colour {
            return text.to_owned();
        }
        let code = match status.color() {
            "green" => "32",
            "orange" => "33",
            _ => "90",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Exercise fields safe to show before the solution is revealed.
fn exercise_json(exercise: &Exercise) -> serde_json::Value {
    serde_json::json!({
        "id": exercise.id(),
        "title": exercise.title(),
        "prompt": exercise.prompt(),
        "relation": exercise.relation(),
    })
}

fn marker(status: ExerciseStatus) -> char {
    match status {
        ExerciseStatus::Solved => '+',
        ExerciseStatus::Skipped => '~',
        ExerciseStatus::Locked => '.',
    }
}

pub fn table_text(result: &TabularResult) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        result.column_names().into_iter().map(Cell::new).collect(),
    ));
    for row in result.rows() {
        table.add_row(Row::new(
            row.into_iter().map(|v| Cell::new(&v.to_string())).collect(),
        ));
    }
    format!("{table}{} row(s)", result.row_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::Value;

    #[test]
    fn table_text_shows_header_values_and_count() {
        let result = TabularResult::from_rows(
            ["title", "rating"],
            vec![vec![Value::from("Dune"), Value::Null]],
        )
        .unwrap();
        let text = table_text(&result);
        assert!(text.contains("title"));
        assert!(text.contains("Dune"));
        assert!(text.contains("NULL"));
        assert!(text.ends_with("1 row(s)"));
    }

    #[test]
    fn exercise_json_hides_solution() {
        use drill_core::model::{ExerciseId, Solution};
        let exercise = Exercise::new(
            ExerciseId::new(3),
            "Top rated",
            "Books with rating >= 4.5.",
            "books",
            Solution::query("SELECT title FROM books WHERE rating >= 4.5"),
        )
        .unwrap();
        let json = exercise_json(&exercise);
        assert_eq!(json["id"], 3);
        assert!(json.get("solution").is_none());
    }

    #[test]
    fn markers_follow_status() {
        assert_eq!(marker(ExerciseStatus::Solved), '+');
        assert_eq!(marker(ExerciseStatus::Skipped), '~');
        assert_eq!(marker(ExerciseStatus::Locked), '.');
    }
}

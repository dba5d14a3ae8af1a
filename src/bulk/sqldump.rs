//! SQL dump import.
//!
//! Reads a dump file line by line, accumulating lines into a statement
//! until one ends with `;`, then executes the statement. One bad
//! statement must not abort the rest of the dump.

use std::path::Path;

use sqlx::MySqlPool;
use tracing::{info, instrument, warn};

use crate::engine::error::EngineResult;

/// Per-dump outcome counters.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DumpReport {
    pub executed: u64,
    pub failed: u64,
}

/// Splits dump text into executable statements.
///
/// Blank lines and `--`/`#` comment lines are skipped. A trailing
/// fragment with no `;` terminator is not executed.
pub(crate) fn split_statements(input: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut buffer = String::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("--") || line.starts_with('#') {
            continue;
        }

        buffer.push_str(line);
        buffer.push(' ');

        if line.ends_with(';') {
            statements.push(buffer.trim().to_string());
            buffer.clear();
        }
    }

    statements
}

/// First few words of a statement, for failure logs.
fn statement_intent(statement: &str) -> String {
    statement
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Executes every statement in the dump file against the pool.
///
/// Failed statements are logged with their intent and skipped; the
/// report carries both counters.
#[instrument(skip(pool, path), fields(path = %path.display()))]
pub async fn import_sql_dump(pool: &MySqlPool, path: &Path) -> EngineResult<DumpReport> {
    info!(path = %path.display(), "importing SQL dump");

    let contents = tokio::fs::read_to_string(path).await?;
    let mut report = DumpReport::default();

    for statement in split_statements(&contents) {
        match sqlx::query(&statement).execute(pool).await {
            Ok(_) => report.executed += 1,
            Err(e) => {
                warn!(
                    intent = %statement_intent(&statement),
                    error = %e,
                    "statement failed; continuing"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        executed = report.executed,
        failed = report.failed,
        "SQL dump import done"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let dump = "-- header comment\n\n# another comment\nINSERT INTO roles VALUES (1);\n";
        assert_eq!(split_statements(dump), vec!["INSERT INTO roles VALUES (1);"]);
    }

    #[test]
    fn multi_line_statements_accumulate_until_the_terminator() {
        let dump = "INSERT INTO clubs\n  (Club_ID, Name)\n  VALUES (1, 'Chess');\nDROP TABLE rsvps;\n";
        let statements = split_statements(dump);
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0],
            "INSERT INTO clubs (Club_ID, Name) VALUES (1, 'Chess');"
        );
        assert_eq!(statements[1], "DROP TABLE rsvps;");
    }

    #[test]
    fn unterminated_trailing_fragment_is_dropped() {
        let dump = "INSERT INTO roles VALUES (1);\nINSERT INTO roles VALUES (2)";
        assert_eq!(split_statements(dump).len(), 1);
    }

    #[test]
    fn statement_boundaries_are_line_granular() {
        // Two statements sharing a line stay one unit; the terminator is
        // only recognized at end of line.
        let dump = "SET x = 1; SET y = 2;\n";
        assert_eq!(split_statements(dump), vec!["SET x = 1; SET y = 2;"]);
    }

    #[test]
    fn intent_is_the_leading_words() {
        assert_eq!(
            statement_intent("INSERT INTO clubs (a, b) VALUES (1, 2);"),
            "INSERT INTO clubs"
        );
    }
}

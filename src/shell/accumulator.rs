// Line accumulator for the SQL shell.
//
// Lines are buffered until a statement is complete: a line ending in `;`
// or a blank line after buffered input. Dot lines are never buffered; they
// reset the buffer and are handed back as meta-commands.

use super::meta::MetaCommand;

/// A complete, normalized statement ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    /// The user typed a leading `sql ` that was stripped.
    pub had_sql_prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing to do.
    Idle,
    /// The line was buffered. `dangling_limit` is set when the buffer
    /// currently ends in a bare `LIMIT`.
    Buffered { dangling_limit: bool },
    /// A dot line; the buffer has been reset.
    Meta(MetaCommand),
    /// The buffer formed a statement; the buffer has been reset.
    Execute(Statement),
    /// The statement ends in `LIMIT` without a count and must not be sent.
    IncompleteLimit(String),
}

#[derive(Debug, Default)]
pub struct LineAccumulator {
    lines: Vec<String>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Text buffered so far, joined the way it will be sent.
    pub fn pending(&self) -> String {
        self.lines.join(" ")
    }

    /// Drop buffered input. Returns whether anything was pending.
    pub fn cancel(&mut self) -> bool {
        let had_input = !self.lines.is_empty();
        self.lines.clear();
        had_input
    }

    pub fn push(&mut self, line: &str) -> Step {
        let line = line.trim();

        if line.starts_with('.') {
            self.lines.clear();
            return Step::Meta(MetaCommand::parse(line));
        }

        if line.is_empty() {
            if self.lines.is_empty() {
                return Step::Idle;
            }
            return self.complete();
        }

        self.lines.push(line.to_string());
        if line.ends_with(';') {
            return self.complete();
        }
        Step::Buffered {
            dangling_limit: ends_with_bare_limit(&self.pending()),
        }
    }

    fn complete(&mut self) -> Step {
        let raw = self.pending();
        self.lines.clear();

        let statement = normalize(&raw);
        if statement.sql.is_empty() {
            Step::Idle
        } else if ends_with_bare_limit(&statement.sql) {
            Step::IncompleteLimit(statement.sql)
        } else {
            Step::Execute(statement)
        }
    }
}

/// Semicolon, whitespace, one quote layer, then an optional `sql ` prefix
/// (with one more quote layer behind it).
pub fn normalize(raw: &str) -> Statement {
    let text = raw.trim_end();
    let text = text.strip_suffix(';').unwrap_or(text).trim();
    let text = unquote(text);

    match strip_sql_prefix(text) {
        Some(rest) => Statement {
            sql: unquote(rest.trim()).to_string(),
            had_sql_prefix: true,
        },
        None => Statement {
            sql: text.to_string(),
            had_sql_prefix: false,
        },
    }
}

fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn strip_sql_prefix(text: &str) -> Option<&str> {
    match text.get(..4) {
        Some(head) if head.eq_ignore_ascii_case("sql ") => Some(&text[4..]),
        _ => None,
    }
}

/// True when the last token is `LIMIT` (any case).
pub fn ends_with_bare_limit(sql: &str) -> bool {
    sql.split_whitespace()
        .last()
        .map(|token| token.trim_end_matches(';').eq_ignore_ascii_case("limit"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execute(step: Step) -> Statement {
        match step {
            Step::Execute(statement) => statement,
            other => panic!("expected a statement, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_line_completes_joined_lines() {
        let mut acc = LineAccumulator::new();
        assert!(matches!(acc.push("SELECT *"), Step::Buffered { .. }));
        assert!(matches!(acc.push("  FROM t"), Step::Buffered { .. }));
        assert!(matches!(
            acc.push("WHERE server_id = ?"),
            Step::Buffered { .. }
        ));

        let stmt = execute(acc.push(""));
        assert_eq!(stmt.sql, "SELECT * FROM t WHERE server_id = ?");
        assert!(acc.is_empty());
        assert_eq!(acc.push(""), Step::Idle);
    }

    #[test]
    fn test_semicolon_completes() {
        let mut acc = LineAccumulator::new();
        acc.push("SELECT 1");
        let stmt = execute(acc.push("FROM t;   "));
        assert_eq!(stmt.sql, "SELECT 1 FROM t");
        assert!(acc.is_empty());
    }

    #[test]
    fn test_blank_line_on_empty_buffer_is_idle() {
        let mut acc = LineAccumulator::new();
        assert_eq!(acc.push(""), Step::Idle);
        assert_eq!(acc.push("   "), Step::Idle);
    }

    #[test]
    fn test_dot_line_resets_buffer() {
        let mut acc = LineAccumulator::new();
        acc.push("SELECT *");
        assert_eq!(acc.push(".clear"), Step::Meta(MetaCommand::Clear));
        assert!(acc.is_empty());

        acc.push("SELECT *");
        assert!(matches!(acc.push(".bogus"), Step::Meta(MetaCommand::Unknown(_))));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_lone_semicolon_after_clear_sends_nothing() {
        let mut acc = LineAccumulator::new();
        acc.push("SELECT");
        acc.push(".clear");
        assert_eq!(acc.push(";"), Step::Idle);
        assert_eq!(acc.push(""), Step::Idle);
    }

    #[test]
    fn test_one_quote_layer_is_stripped() {
        assert_eq!(normalize("\"SELECT 1\";").sql, "SELECT 1");
        assert_eq!(normalize("'SELECT 1'").sql, "SELECT 1");
        assert_eq!(normalize("\"\"SELECT 1\"\"").sql, "\"SELECT 1\"");
        // Mismatched quotes are left alone.
        assert_eq!(normalize("\"SELECT 1'").sql, "\"SELECT 1'");
    }

    #[test]
    fn test_sql_prefix_is_stripped() {
        let stmt = normalize("SQL select 1;");
        assert_eq!(stmt.sql, "select 1");
        assert!(stmt.had_sql_prefix);

        let stmt = normalize("sql \"SELECT * FROM t\"");
        assert_eq!(stmt.sql, "SELECT * FROM t");
        assert!(stmt.had_sql_prefix);

        let stmt = normalize("sqlite_master");
        assert!(!stmt.had_sql_prefix);
        assert_eq!(stmt.sql, "sqlite_master");
    }

    #[test]
    fn test_dangling_limit_is_rejected() {
        let mut acc = LineAccumulator::new();
        assert_eq!(
            acc.push("SELECT * FROM t LIMIT"),
            Step::Buffered {
                dangling_limit: true
            }
        );
        assert_eq!(
            acc.push(""),
            Step::IncompleteLimit("SELECT * FROM t LIMIT".into())
        );
        assert!(acc.is_empty());

        assert_eq!(
            acc.push("select * from t limit;"),
            Step::IncompleteLimit("select * from t limit".into())
        );
    }

    #[test]
    fn test_limit_with_count_is_fine() {
        let mut acc = LineAccumulator::new();
        assert_eq!(
            acc.push("SELECT * FROM t LIMIT"),
            Step::Buffered {
                dangling_limit: true
            }
        );
        assert_eq!(
            acc.push("10"),
            Step::Buffered {
                dangling_limit: false
            }
        );
        assert_eq!(execute(acc.push(";")).sql, "SELECT * FROM t LIMIT 10");
        assert!(!ends_with_bare_limit("SELECT unlimited"));
    }

    #[test]
    fn test_cancel_reports_pending_input() {
        let mut acc = LineAccumulator::new();
        assert!(!acc.cancel());
        acc.push("SELECT");
        assert!(acc.cancel());
        assert!(acc.is_empty());
    }
}

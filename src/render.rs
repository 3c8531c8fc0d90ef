// Plain-text rendering: column-aligned tables for listings and query results,
// plus the hints attached to common query errors.

use std::io::{self, Write};

use crate::query::QueryResult;

/// Spaces between columns.
const GAP: usize = 3;

/// A column-aligned table with a header and a separator row.
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);
        let mut widths = vec![0; columns];
        for (i, h) in self.headers.iter().enumerate() {
            widths[i] = widths[i].max(h.chars().count());
        }
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        widths
    }

    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        let widths = self.widths();
        write_line(out, &widths, self.headers.iter().map(String::as_str))?;
        let rules: Vec<String> = widths.iter().map(|w| "─".repeat((*w).max(2))).collect();
        write_line(out, &widths, rules.iter().map(String::as_str))?;
        for row in &self.rows {
            write_line(out, &widths, row.iter().map(String::as_str))?;
        }
        Ok(())
    }
}

fn write_line<'a>(
    out: &mut dyn Write,
    widths: &[usize],
    cells: impl Iterator<Item = &'a str>,
) -> io::Result<()> {
    let mut line = String::new();
    let cells: Vec<&str> = cells.collect();
    for (i, cell) in cells.iter().enumerate() {
        line.push_str(cell);
        if i + 1 < cells.len() {
            let pad = widths[i].saturating_sub(cell.chars().count()) + GAP;
            line.extend(std::iter::repeat(' ').take(pad));
        }
    }
    writeln!(out, "{}", line.trim_end())
}

/// Build the table for a result that declares columns.
pub fn result_table(result: &QueryResult) -> Table {
    let mut table = Table::new(result.columns.iter().cloned());
    for row in &result.rows {
        table.push_row(row.iter().map(|c| c.display().to_string()).collect());
    }
    table
}

/// Render a successful result: a table for row sets, counts for mutations.
pub fn write_result(out: &mut dyn Write, result: &QueryResult) -> io::Result<()> {
    if result.is_mutation() {
        writeln!(
            out,
            "Query executed successfully ({}ms)",
            result.execution_time_ms
        )?;
        return writeln!(out, "Rows affected: {}", result.rows_affected);
    }

    if result.rows.is_empty() {
        writeln!(out, "No rows returned.")?;
        writeln!(out)?;
        for line in EMPTY_RESULT_NOTE {
            writeln!(out, "{}", line)?;
        }
        return Ok(());
    }

    result_table(result).write_to(out)?;
    writeln!(out)?;
    writeln!(
        out,
        "Rows returned: {} ({}ms)",
        result.rows.len(),
        result.execution_time_ms
    )
}

/// Render a decoded response in the shell. Only an error message takes the
/// error path; a bare `success: false` still shows whatever came back.
pub fn write_outcome(out: &mut dyn Write, result: &QueryResult) -> io::Result<()> {
    if let Some(message) = result.error_message.as_deref() {
        return write_error(out, message);
    }
    if !result.success && result.is_empty() {
        for line in NO_RESULTS_NOTE {
            writeln!(out, "{}", line)?;
        }
        return Ok(());
    }
    write_result(out, result)
}

const NO_RESULTS_NOTE: &[&str] = &[
    "Query returned no results.",
    "",
    "This could mean:",
    "  - No tables exist yet (initialize your nameserver schema)",
    "  - Tables don't match the expected pattern",
    "  - Use .nameservers to see available nameservers",
];

const EMPTY_RESULT_NOTE: &[&str] = &[
    "Note: If you expected to see tables, make sure:",
    "  1. Your nameserver has been initialized",
    "  2. Tables follow the pattern: {baseName}_{nameserverName}",
    "  3. Use .nameservers to see available nameservers",
];

const PARSE_HINT: &[&str] = &[
    "Common causes:",
    "  - Incomplete query (e.g., LIMIT without a number)",
    "  - Missing semicolon or closing parenthesis",
    "  - Typo in SQL syntax",
    "",
    "Example: SELECT * FROM table WHERE server_id = ? LIMIT 10;",
];

const MISSING_TABLE_HINT: &[&str] = &[
    "Make sure:",
    "  - Table name includes nameserver suffix (e.g., conversations_name1)",
    "  - Use .tables to see available tables",
    "  - Use .nameservers to see nameserver names",
];

const SERVER_ID_HINT: &[&str] = &["Remember: All queries must include WHERE server_id = ?"];

/// Hint lines for a query error, matched on well-known substrings.
pub fn error_hint(message: &str) -> Option<&'static [&'static str]> {
    if message.contains("SQL_PARSE_ERROR") || message.contains("unexpected end of input") {
        Some(PARSE_HINT)
    } else if message.contains("no such table") {
        Some(MISSING_TABLE_HINT)
    } else if message.contains("server_id") {
        Some(SERVER_ID_HINT)
    } else {
        None
    }
}

pub fn write_error(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "Error: {}", message)?;
    if let Some(lines) = error_hint(message) {
        writeln!(out)?;
        for line in lines {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

/// `2024-03-01T10:00:00Z` → `2024-03-01`; anything unparsable is shown as-is.
pub fn short_date(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%Y-%m-%d").to_string(),
        Err(_) if raw.is_empty() => "-".to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Truncate to `max` characters with a trailing ellipsis; empty becomes `-`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.is_empty() {
        return "-".to_string();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}

pub fn status_label(active: bool) -> &'static str {
    if active {
        "Active"
    } else {
        "Inactive"
    }
}

// Query results returned by the SQL proxy endpoint.
//
// The endpoint answers either `{columns, rows, ...}` directly or the same
// object wrapped in a `result` envelope (system queries). Values are
// classified once here, so rendering never has to inspect raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single cell of a result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Null,
    Text(String),
    /// Any non-string JSON value, kept in its encoded form.
    Json(String),
}

impl Cell {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::String(s) => Cell::Text(s),
            other => Cell::Json(other.to_string()),
        }
    }

    /// Text shown in a rendered table.
    pub fn display(&self) -> &str {
        match self {
            Cell::Null => "NULL",
            Cell::Text(s) | Cell::Json(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub rows_affected: i64,
    pub execution_time_ms: i64,
    pub success: bool,
    pub error_message: Option<String>,
}

impl QueryResult {
    /// Statements without declared columns are reported as mutations.
    pub fn is_mutation(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}

/// Request body for the SQL endpoint.
#[derive(Serialize, Debug)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct RawQueryResponse {
    #[serde(default)]
    columns: Vec<Option<String>>,
    #[serde(default)]
    rows: Vec<Value>,
    #[serde(default)]
    rows_affected: Option<f64>,
    #[serde(default)]
    execution_time: Option<f64>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Decode a response body, unwrapping the optional `result` envelope.
pub fn decode_query_response(body: &str) -> Result<QueryResult, serde_json::Error> {
    let mut value: Value = serde_json::from_str(body)?;
    let envelope = value
        .get_mut("result")
        .filter(|inner| inner.is_object())
        .map(Value::take);
    let payload = envelope.unwrap_or(value);
    let raw: RawQueryResponse = serde_json::from_value(payload)?;
    Ok(raw.into())
}

impl From<RawQueryResponse> for QueryResult {
    fn from(raw: RawQueryResponse) -> Self {
        let columns: Vec<String> = raw
            .columns
            .into_iter()
            .map(|c| c.unwrap_or_default())
            .collect();

        // Rows that are not arrays are kept as empty rows so the row count
        // still matches what the server sent.
        let rows: Vec<Vec<Cell>> = raw
            .rows
            .into_iter()
            .map(|row| match row {
                Value::Array(cells) => cells.into_iter().map(Cell::from_value).collect(),
                _ => Vec::new(),
            })
            .collect();

        let error_message = raw.error_message.filter(|m| !m.is_empty());
        // An absent `success` flag counts as success; an error message
        // always wins over the flag.
        let success = raw.success.unwrap_or(true) && error_message.is_none();

        QueryResult {
            columns,
            rows,
            rows_affected: raw.rows_affected.unwrap_or(0.0) as i64,
            execution_time_ms: raw.execution_time.unwrap_or(0.0) as i64,
            success,
            error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_direct_response() {
        let result = decode_query_response(
            r#"{"columns":["id","name"],"rows":[["1","alice"],[2,null]],"executionTime":12,"success":true}"#,
        )
        .unwrap();
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.rows[0][1], Cell::Text("alice".into()));
        assert_eq!(result.rows[1][0], Cell::Json("2".into()));
        assert_eq!(result.rows[1][1], Cell::Null);
        assert_eq!(result.execution_time_ms, 12);
        assert!(result.success);
    }

    #[test]
    fn test_decode_result_envelope() {
        let result = decode_query_response(
            r#"{"result":{"columns":["name"],"rows":[["conversations_db"]]}}"#,
        )
        .unwrap();
        assert_eq!(result.columns, vec!["name"]);
        assert_eq!(result.rows.len(), 1);
        assert!(result.success);
    }

    #[test]
    fn test_error_message_marks_failure() {
        let result =
            decode_query_response(r#"{"success":true,"errorMessage":"no such table: foo"}"#)
                .unwrap();
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("no such table: foo"));
    }

    #[test]
    fn test_failure_flag_is_kept_without_message() {
        let result = decode_query_response(r#"{"success":false}"#).unwrap();
        assert!(!result.success);
        assert!(result.error_message.is_none());
        assert!(result.is_empty());
    }

    #[test]
    fn test_mutation_counts() {
        let result =
            decode_query_response(r#"{"columns":[],"rows":[],"rowsAffected":3,"executionTime":4.7}"#)
                .unwrap();
        assert!(result.is_mutation());
        assert_eq!(result.rows_affected, 3);
        assert_eq!(result.execution_time_ms, 4);
    }

    #[test]
    fn test_nested_json_cell_is_encoded() {
        let cell = Cell::from_value(serde_json::json!({"a": [1, true]}));
        assert_eq!(cell.display(), r#"{"a":[1,true]}"#);
    }

    #[test]
    fn test_request_omits_empty_args() {
        let body = serde_json::to_string(&QueryRequest {
            query: "SELECT 1",
            args: Vec::new(),
        })
        .unwrap();
        assert_eq!(body, r#"{"query":"SELECT 1"}"#);
    }
}

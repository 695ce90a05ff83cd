//! Query-related data models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// What a statement does, as far as the classifier can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementIntent {
    ReadOnly,
    Mutating,
    /// Leading keyword not recognized; treated like `Mutating` by policy.
    Unknown,
}

impl std::fmt::Display for StatementIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read_only"),
            Self::Mutating => write!(f, "mutating"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A raw SQL string together with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedStatement {
    pub sql: String,
    pub intent: StatementIntent,
    /// Keyword that decided the intent, uppercased. Empty when the text has no keyword.
    pub keyword: String,
    /// Non-empty statements found in `sql`.
    pub statement_count: usize,
}

impl ClassifiedStatement {
    pub fn is_read_only(&self) -> bool {
        self.intent == StatementIntent::ReadOnly
    }

    pub fn is_stacked(&self) -> bool {
        self.statement_count > 1
    }

    pub fn is_empty(&self) -> bool {
        self.statement_count == 0
    }
}

/// Rows produced by one statement, capped by the execution policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// True when the statement produced more rows than the call's cap (`limit` clamped to `max_result_rows`).
    pub truncated: bool,
    pub execution_time_ms: u64,
    /// Set for statements executed in write mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
}

impl QueryResult {
    /// Build a result from at most `cap + 1` materialized rows.
    pub fn from_rows(
        columns: Vec<String>,
        mut rows: Vec<serde_json::Map<String, JsonValue>>,
        cap: usize,
        execution_time_ms: u64,
    ) -> Self {
        let truncated = rows.len() > cap;
        rows.truncate(cap);
        Self {
            columns,
            row_count: rows.len(),
            rows,
            truncated,
            execution_time_ms,
            rows_affected: None,
        }
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.rows_affected.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(i: i64) -> serde_json::Map<String, JsonValue> {
        let mut m = serde_json::Map::new();
        m.insert("id".into(), json!(i));
        m
    }

    #[test]
    fn test_from_rows_truncates_extra_row() {
        let rows = (0..4).map(row).collect();
        let result = QueryResult::from_rows(vec!["id".into()], rows, 3, 7);
        assert!(result.truncated);
        assert_eq!(result.row_count, 3);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.execution_time_ms, 7);
    }

    #[test]
    fn test_from_rows_exact_fit_is_not_truncated() {
        let rows = (0..3).map(row).collect();
        let result = QueryResult::from_rows(vec!["id".into()], rows, 3, 0);
        assert!(!result.truncated);
        assert_eq!(result.row_count, 3);
    }

    #[test]
    fn test_rows_affected_skipped_when_absent() {
        let result = QueryResult::default();
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("rows_affected").is_none());
        assert!(result.is_empty());
    }

    #[test]
    fn test_classified_statement_helpers() {
        let stmt = ClassifiedStatement {
            sql: "SELECT 1; SELECT 2".into(),
            intent: StatementIntent::ReadOnly,
            keyword: "SELECT".into(),
            statement_count: 2,
        };
        assert!(stmt.is_read_only());
        assert!(stmt.is_stacked());
        assert!(!stmt.is_empty());
    }
}

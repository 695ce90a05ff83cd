//! Result formatting for tool responses.
//!
//! Row results are returned as JSON by default. Callers can ask for an ASCII
//! table (MySQL CLI style) or a Markdown table instead, in which case the rows
//! are rendered into `formatted` and left out of the structured payload.

use crate::models::QueryResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for row results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// ASCII table format (like MySQL CLI)
    Table,
    /// Markdown table format
    Markdown,
}

/// Rows returned by `get_table_data`, `execute_read_query` and `execute_query`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Column names in result order. Empty if format is table/markdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// Result rows as column-name to value maps. Empty if format is table/markdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// Pre-rendered rows when format is table or markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    /// True when more rows existed than were returned
    pub truncated: bool,
    /// Number of rows returned
    pub row_count: usize,
    /// Statement execution time in milliseconds
    pub execution_time_ms: u64,
    /// Rows changed by a write statement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
}

impl QueryOutput {
    pub fn from_result(result: QueryResult, format: OutputFormat) -> Self {
        let formatted = match format {
            OutputFormat::Json => None,
            OutputFormat::Table => Some(format_as_table(
                &result.columns,
                &result.rows,
                result.truncated,
                result.execution_time_ms,
            )),
            OutputFormat::Markdown => Some(format_as_markdown(
                &result.columns,
                &result.rows,
                result.truncated,
            )),
        };

        let (columns, rows) = if formatted.is_some() {
            (Vec::new(), Vec::new())
        } else {
            (result.columns, result.rows)
        };

        Self {
            columns,
            rows,
            formatted,
            truncated: result.truncated,
            row_count: result.row_count,
            execution_time_ms: result.execution_time_ms,
            rows_affected: result.rows_affected,
        }
    }
}

impl From<QueryResult> for QueryOutput {
    fn from(result: QueryResult) -> Self {
        Self::from_result(result, OutputFormat::Json)
    }
}

/// Render a single value for display in a table cell.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

/// Markdown cells cannot contain raw pipes or line breaks.
fn escape_markdown_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Format rows as an ASCII table (MySQL CLI style).
pub fn format_as_table(
    columns: &[String],
    rows: &[serde_json::Map<String, JsonValue>],
    truncated: bool,
    execution_time_ms: u64,
) -> String {
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in rows {
        for (i, col) in columns.iter().enumerate() {
            if let Some(value) = row.get(col) {
                widths[i] = widths[i].max(format_value(value).width());
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = String::new();
    output.push_str(&separator);
    for (col, w) in columns.iter().zip(&widths) {
        output.push_str(&format!("| {} ", pad(col, *w, Align::Center)));
    }
    output.push_str("|\n");
    output.push_str(&separator);

    for row in rows {
        for (col, w) in columns.iter().zip(&widths) {
            let value = row.get(col).unwrap_or(&JsonValue::Null);
            let align = if value.is_number() {
                Align::Right
            } else {
                Align::Left
            };
            output.push_str(&format!("| {} ", pad(&format_value(value), *w, align)));
        }
        output.push_str("|\n");
    }
    output.push_str(&separator);

    let row_text = if rows.len() == 1 { "row" } else { "rows" };
    let truncated_text = if truncated { " (truncated)" } else { "" };
    output.push_str(&format!(
        "{} {} in set{} ({:.2} sec)\n",
        rows.len(),
        row_text,
        truncated_text,
        execution_time_ms as f64 / 1000.0
    ));
    output
}

/// Format rows as a Markdown table.
pub fn format_as_markdown(
    columns: &[String],
    rows: &[serde_json::Map<String, JsonValue>],
    truncated: bool,
) -> String {
    if columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();
    for col in columns {
        output.push_str(&format!("| {} ", escape_markdown_cell(col)));
    }
    output.push_str("|\n");
    output.push_str(&"|---".repeat(columns.len()));
    output.push_str("|\n");

    for row in rows {
        for col in columns {
            let value = row.get(col).unwrap_or(&JsonValue::Null);
            output.push_str(&format!("| {} ", escape_markdown_cell(&format_value(value))));
        }
        output.push_str("|\n");
    }

    let truncated_text = if truncated { " *(truncated)*" } else { "" };
    output.push_str(&format!("\n*{} rows*{}", rows.len(), truncated_text));
    output
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
    Center,
}

// std padding counts chars, not display columns
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{text}{}", " ".repeat(fill)),
        Align::Right => format!("{}{text}", " ".repeat(fill)),
        Align::Center => {
            let left = fill / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(fill - left))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> (Vec<String>, Vec<serde_json::Map<String, JsonValue>>) {
        let columns = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            json!({"id": 1, "name": "Alice"}).as_object().unwrap().clone(),
            json!({"id": 22, "name": null}).as_object().unwrap().clone(),
        ];
        (columns, rows)
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&JsonValue::Null), "NULL");
        assert_eq!(format_value(&json!(true)), "true");
        assert_eq!(format_value(&json!(1.5)), "1.5");
        assert_eq!(format_value(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_ascii_table() {
        let (columns, rows) = sample();
        let table = format_as_table(&columns, &rows, true, 1500);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "+----+-------+");
        assert_eq!(lines[1], "| id | name  |");
        assert_eq!(lines[3], "|  1 | Alice |");
        assert_eq!(lines[4], "| 22 | NULL  |");
        assert_eq!(lines[6], "2 rows in set (truncated) (1.50 sec)");
    }

    #[test]
    fn test_ascii_table_wide_characters() {
        let columns = vec!["city".to_string()];
        let rows = vec![json!({"city": "東京"}).as_object().unwrap().clone()];
        let table = format_as_table(&columns, &rows, false, 0);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "+------+");
        assert_eq!(lines[3], "| 東京 |");
    }

    #[test]
    fn test_markdown_table() {
        let (columns, mut rows) = sample();
        rows[0].insert("name".into(), json!("a|b"));
        let md = format_as_markdown(&columns, &rows, false);
        assert!(md.starts_with("| id | name |\n|---|---|\n"));
        assert!(md.contains("| 1 | a\\|b |"));
        assert!(md.ends_with("*2 rows*"));
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(format_as_table(&[], &[], false, 0), "Empty set");
        assert_eq!(format_as_markdown(&[], &[], false), "*Empty set*");
    }

    #[test]
    fn test_zero_rows_keep_header() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let table = format_as_table(&columns, &[], false, 0);
        assert!(table.contains("| id | name |"));
        assert!(table.ends_with("0 rows in set (0.00 sec)\n"));
    }

    #[test]
    fn test_query_output_formats() {
        let (columns, rows) = sample();
        let result = QueryResult::from_rows(columns, rows, 10, 3);

        let json_out = QueryOutput::from_result(result.clone(), OutputFormat::Json);
        assert_eq!(json_out.rows.len(), 2);
        assert!(json_out.formatted.is_none());

        let md_out = QueryOutput::from_result(result, OutputFormat::Markdown);
        assert!(md_out.rows.is_empty());
        assert_eq!(md_out.row_count, 2);
        assert!(md_out.formatted.unwrap().contains("Alice"));
    }
}

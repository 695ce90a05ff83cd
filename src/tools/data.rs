//! Table sampling tools.
//!
//! `get_table_data` and `get_unique_values` build their SQL from validated
//! identifiers only; callers never contribute raw SQL text here.

use super::ToolContext;
use super::format::{OutputFormat, QueryOutput};
use super::identifier::{
    SimpleIdentifier, ValidatedIdentifier, validate_identifier, validate_simple_identifier,
};
use crate::error::{ToolError, ToolResult};
use crate::models::Dialect;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

pub const DEFAULT_TABLE_DATA_LIMIT: u32 = 10;
pub const DEFAULT_UNIQUE_VALUES_LIMIT: u32 = 25;

/// Input for the get_table_data tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTableDataInput {
    /// Table name, optionally qualified as `schema.table`
    pub table_name: String,
    /// Schema name. Defaults to the connection's search path.
    #[serde(default)]
    pub schema: Option<String>,
    /// Rows to return. Default: 10, capped by the server's max result rows.
    #[serde(default)]
    pub limit: Option<i64>,
    /// Output format: json (default), table, or markdown
    #[serde(default)]
    pub format: OutputFormat,
}

/// Input for the get_unique_values tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetUniqueValuesInput {
    /// Table name, optionally qualified as `schema.table`
    pub table_name: String,
    /// Column whose distinct values are counted
    pub column_name: String,
    #[serde(default)]
    pub schema: Option<String>,
    /// Distinct values to return. Default: 25, capped by the server's max result rows.
    #[serde(default)]
    pub limit: Option<i64>,
}

/// One distinct value and how many rows hold it.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ValueFrequency {
    pub value: JsonValue,
    pub frequency: u64,
}

/// Output for the get_unique_values tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UniqueValuesOutput {
    pub table: String,
    pub column: String,
    /// Most frequent first; ties ordered by value
    pub values: Vec<ValueFrequency>,
    pub count: usize,
    pub truncated: bool,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DataToolHandler {
    context: ToolContext,
}

impl DataToolHandler {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }

    fn dialect(&self) -> Dialect {
        self.context.database.dialect()
    }

    pub async fn get_table_data(&self, input: GetTableDataInput) -> ToolResult<QueryOutput> {
        let table = resolve_table(&input.table_name, input.schema.as_deref())?;
        let cap = self
            .context
            .policy()
            .clamp_limit(input.limit, DEFAULT_TABLE_DATA_LIMIT);

        let sql = table_data_sql(&table, self.dialect(), cap);
        let result = self.context.enforcer.fetch_generated(&sql, cap).await?;

        info!(
            table = %table,
            rows = result.row_count,
            truncated = result.truncated,
            "Fetched table data"
        );

        Ok(QueryOutput::from_result(result, input.format))
    }

    pub async fn get_unique_values(
        &self,
        input: GetUniqueValuesInput,
    ) -> ToolResult<UniqueValuesOutput> {
        let table = resolve_table(&input.table_name, input.schema.as_deref())?;
        let column = validate_simple_identifier(&input.column_name)?;

        let descriptor = self.context.catalog.describe_table(&table).await?;
        if !descriptor.columns.iter().any(|c| c.name == column.as_str()) {
            return Err(ToolError::not_found_with_hint(
                "Column",
                format!("{}.{}", descriptor.qualified_name(), column),
                format!(
                    "Available columns: {}",
                    descriptor.column_names().join(", ")
                ),
            ));
        }

        let cap = self
            .context
            .policy()
            .clamp_limit(input.limit, DEFAULT_UNIQUE_VALUES_LIMIT);
        let sql = unique_values_sql(&table, &column, self.dialect(), cap);
        let result = self.context.enforcer.fetch_generated(&sql, cap).await?;

        let values: Vec<ValueFrequency> = result
            .rows
            .into_iter()
            .map(|mut row| ValueFrequency {
                value: row.remove("value").unwrap_or(JsonValue::Null),
                frequency: row
                    .get("frequency")
                    .and_then(frequency_count)
                    .unwrap_or_default(),
            })
            .collect();

        info!(
            table = %table,
            column = %column,
            distinct = values.len(),
            truncated = result.truncated,
            "Counted unique values"
        );

        Ok(UniqueValuesOutput {
            table: descriptor.qualified_name(),
            column: column.to_string(),
            count: values.len(),
            values,
            truncated: result.truncated,
            execution_time_ms: result.execution_time_ms,
        })
    }
}

fn resolve_table(table_name: &str, schema: Option<&str>) -> ToolResult<ValidatedIdentifier> {
    let schema = schema.map(validate_simple_identifier).transpose()?;
    validate_identifier(table_name)?.with_schema(schema)
}

// One extra row tells the enforcer whether the result was truncated.
fn table_data_sql(table: &ValidatedIdentifier, dialect: Dialect, cap: usize) -> String {
    format!("SELECT * FROM {} LIMIT {}", table.quoted(dialect), cap + 1)
}

fn unique_values_sql(
    table: &ValidatedIdentifier,
    column: &SimpleIdentifier,
    dialect: Dialect,
    cap: usize,
) -> String {
    let col = column.quoted(dialect);
    format!(
        "SELECT {col} AS value, COUNT({col}) AS frequency FROM {table} \
         WHERE {col} IS NOT NULL GROUP BY {col} ORDER BY 2 DESC, 1 ASC LIMIT {limit}",
        table = table.quoted(dialect),
        limit = cap + 1,
    )
}

// MySQL can hand COUNT back as a DECIMAL string under some modes.
fn frequency_count(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

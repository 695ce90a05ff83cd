//! Free-form SQL tools.
//!
//! This module implements `execute_read_query` and `execute_query`. Every
//! statement is classified before it reaches the database; the enforcer then
//! rejects stacked statements and anything the policy does not allow.

use super::ToolContext;
use super::format::{OutputFormat, QueryOutput};
use crate::error::ToolResult;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

/// Input for the execute_read_query and execute_query tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// A single SQL statement. Multiple statements separated by ';' are rejected.
    pub sql: String,
    /// Maximum rows to return. Defaults to and is capped at the server's max result rows.
    #[serde(default)]
    pub limit: Option<i64>,
    /// Output format: "json" returns structured data, "table" returns ASCII table, "markdown" returns markdown table
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone)]
pub struct QueryToolHandler {
    context: ToolContext,
}

impl QueryToolHandler {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }

    /// Run a statement that must classify as read-only, whatever the server mode.
    pub async fn execute_read_query(&self, input: ExecuteQueryInput) -> ToolResult<QueryOutput> {
        self.run(input, true).await
    }

    /// Run any single statement the policy allows.
    pub async fn execute_query(&self, input: ExecuteQueryInput) -> ToolResult<QueryOutput> {
        self.run(input, false).await
    }

    async fn run(&self, input: ExecuteQueryInput, require_read_only: bool) -> ToolResult<QueryOutput> {
        let statement = self.context.classifier.classify(&input.sql);
        let result = self
            .context
            .enforcer
            .execute(&statement, input.limit, require_read_only)
            .await?;

        info!(
            intent = %statement.intent,
            keyword = %statement.keyword,
            rows = result.row_count,
            rows_affected = ?result.rows_affected,
            truncated = result.truncated,
            execution_time_ms = result.execution_time_ms,
            "Statement executed"
        );

        Ok(QueryOutput::from_result(result, input.format))
    }
}

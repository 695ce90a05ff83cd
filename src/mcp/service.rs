//! MCP service implementation using rmcp.
//!
//! This module defines the DbService struct with all gateway tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::models::{ExecutionPolicy, TableDescriptor};
use crate::tools::data::{DataToolHandler, GetTableDataInput, GetUniqueValuesInput, UniqueValuesOutput};
use crate::tools::format::QueryOutput;
use crate::tools::query::{ExecuteQueryInput, QueryToolHandler};
use crate::tools::schema::{
    DescribeTableInput, ListSchemasOutput, ListTablesInput, ListTablesOutput, RelationshipsOutput,
    SchemaToolHandler,
};
use crate::tools::ToolContext;
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

#[derive(Clone)]
pub struct DbService {
    /// Advertised server title
    name: String,
    schema: SchemaToolHandler,
    data: DataToolHandler,
    query: QueryToolHandler,
    policy: ExecutionPolicy,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    /// Create a new DbService over a shared tool context.
    pub fn new(context: ToolContext, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: *context.policy(),
            schema: SchemaToolHandler::new(context.clone()),
            data: DataToolHandler::new(context.clone()),
            query: QueryToolHandler::new(context),
            tool_router: Self::tool_router(),
        }
    }

    fn instructions(&self) -> String {
        let mode = if self.policy.read_only {
            "read-only: `execute_query` accepts only statements classified as read-only"
        } else {
            "read-write: `execute_query` may modify data; each write runs in its own transaction"
        };
        format!(
            "SQL gateway tools for exploring and querying one database.\n\
            \n\
            ## Workflow\n\
            1. `list_schemas` and `list_tables` to find tables\n\
            2. `describe_table` and `get_table_relationships` to learn columns and joins\n\
            3. `get_table_data` and `get_unique_values` to sample contents\n\
            4. `execute_read_query` for SELECT/SHOW/DESCRIBE/EXPLAIN; `execute_query` for anything else\n\
            \n\
            ## Rules\n\
            - Mode: {mode}.\n\
            - One statement per call; `;`-separated statements are rejected.\n\
            - Table, schema and column names must match [A-Za-z_][A-Za-z0-9_]*.\n\
            - At most {rows} rows are returned per call; `truncated` tells you more exist.\n\
            - Each statement is cancelled after {secs} seconds.",
            rows = self.policy.max_result_rows,
            secs = self.policy.query_timeout_secs,
        )
    }
}

#[tool_router]
impl DbService {
    #[tool(
        description = "List the schemas visible to this connection.\nSystem schemas are excluded.",
        annotations(title = "List schemas", read_only_hint = true, destructive_hint = false, open_world_hint = false)
    )]
    async fn list_schemas(&self) -> Result<Json<ListSchemasOutput>, McpError> {
        self.schema.list_schemas().await.map(Json).map_err(Into::into)
    }

    #[tool(
        description = "List tables and views.\nFilter by `schema`; omit it to list every visible schema.",
        annotations(title = "List tables", read_only_hint = true, destructive_hint = false, open_world_hint = false)
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<ListTablesOutput>, McpError> {
        self.schema.list_tables(input).await.map(Json).map_err(Into::into)
    }

    #[tool(
        description = "Describe a table: columns with types, nullability and defaults, primary key, foreign keys and indexes.",
        annotations(title = "Describe table", read_only_hint = true, destructive_hint = false, open_world_hint = false)
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<Json<TableDescriptor>, McpError> {
        self.schema.describe_table(input).await.map(Json).map_err(Into::into)
    }

    #[tool(
        description = "List every foreign key in the database, plus a per-table map of outgoing references and incoming referenced_by links.",
        annotations(title = "Table relationships", read_only_hint = true, destructive_hint = false, open_world_hint = false)
    )]
    async fn get_table_relationships(&self) -> Result<Json<RelationshipsOutput>, McpError> {
        self.schema
            .get_table_relationships()
            .await
            .map(Json)
            .map_err(Into::into)
    }

    #[tool(
        description = "Return sample rows from a table.\nDefault limit: 10, capped by the server's max result rows.\nOutput format: json (default), table, or markdown.",
        annotations(title = "Get table data", read_only_hint = true, destructive_hint = false, open_world_hint = false)
    )]
    async fn get_table_data(
        &self,
        Parameters(input): Parameters<GetTableDataInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.data.get_table_data(input).await.map(Json).map_err(Into::into)
    }

    #[tool(
        description = "Count the distinct non-null values of a column, most frequent first.\nDefault limit: 25.",
        annotations(title = "Get unique values", read_only_hint = true, destructive_hint = false, open_world_hint = false)
    )]
    async fn get_unique_values(
        &self,
        Parameters(input): Parameters<GetUniqueValuesInput>,
    ) -> Result<Json<UniqueValuesOutput>, McpError> {
        self.data.get_unique_values(input).await.map(Json).map_err(Into::into)
    }

    #[tool(
        description = "Execute one read-only statement (SELECT, SHOW, DESCRIBE, EXPLAIN, read-only WITH).\nRejected if the statement could modify data, even when the server allows writes.\nOutput format: json (default), table, or markdown.",
        annotations(title = "Execute read query", read_only_hint = true, destructive_hint = false, open_world_hint = false)
    )]
    async fn execute_read_query(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.query.execute_read_query(input).await.map(Json).map_err(Into::into)
    }

    #[tool(
        description = "Execute one SQL statement, including INSERT/UPDATE/DELETE and DDL when the server is not read-only.\nReports rows affected for writes.\nOutput format: json (default), table, or markdown.",
        annotations(title = "Execute query", read_only_hint = false, destructive_hint = true, open_world_hint = false)
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.query.execute_query(input).await.map(Json).map_err(Into::into)
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                title: Some(self.name.clone()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(self.instructions()),
        }
    }
}

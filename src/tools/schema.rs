//! Schema introspection tools.
//!
//! This module implements the `list_schemas`, `list_tables`, `describe_table`
//! and `get_table_relationships` MCP tools.

use super::ToolContext;
use super::identifier::{validate_identifier, validate_simple_identifier};
use crate::error::ToolResult;
use crate::models::{
    ForeignKeyDescriptor, TableDescriptor, TableRelationships, TableSummary,
    relationships_by_table,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Output for the list_schemas tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListSchemasOutput {
    pub schemas: Vec<String>,
    pub count: usize,
}

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Schema to list. Omit to list tables of every visible schema.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    /// Tables and views, ordered by schema then name
    pub tables: Vec<TableSummary>,
    /// Total number of tables/views returned
    pub count: usize,
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Table name, optionally qualified as `schema.table`
    pub table_name: String,
    /// Schema name. Defaults to the connection's default schema.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Output for the get_table_relationships tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RelationshipsOutput {
    /// Every foreign key, ordered by schema, table, constraint and column position
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    /// Outbound and inbound links keyed by qualified table name
    pub tables: BTreeMap<String, TableRelationships>,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct SchemaToolHandler {
    context: ToolContext,
}

impl SchemaToolHandler {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }

    pub async fn list_schemas(&self) -> ToolResult<ListSchemasOutput> {
        let schemas = self.context.catalog.list_schemas().await?;
        info!(count = schemas.len(), "Listed schemas");
        Ok(ListSchemasOutput {
            count: schemas.len(),
            schemas,
        })
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> ToolResult<ListTablesOutput> {
        let schema = input
            .schema
            .as_deref()
            .map(validate_simple_identifier)
            .transpose()?;

        let tables = self.context.catalog.list_tables(schema.as_ref()).await?;
        let count = tables.len();

        info!(schema = ?input.schema, count, "Listed tables");

        Ok(ListTablesOutput { tables, count })
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> ToolResult<TableDescriptor> {
        let schema = input
            .schema
            .as_deref()
            .map(validate_simple_identifier)
            .transpose()?;
        let table = validate_identifier(&input.table_name)?.with_schema(schema)?;

        let descriptor = self.context.catalog.describe_table(&table).await?;

        info!(
            table = %descriptor.qualified_name(),
            columns = descriptor.columns.len(),
            foreign_keys = descriptor.foreign_keys.len(),
            "Described table"
        );

        Ok(descriptor)
    }

    pub async fn get_table_relationships(&self) -> ToolResult<RelationshipsOutput> {
        let foreign_keys = self.context.catalog.get_table_relationships().await?;
        let tables = relationships_by_table(&foreign_keys);

        info!(
            foreign_keys = foreign_keys.len(),
            tables = tables.len(),
            "Collected table relationships"
        );

        Ok(RelationshipsOutput {
            count: foreign_keys.len(),
            foreign_keys,
            tables,
        })
    }
}

//! MCP tool implementations.
//!
//! - `identifier`: validation of table/schema/column names
//! - `classifier`: statement intent detection for free-form SQL
//! - `schema`: `list_schemas`, `list_tables`, `describe_table`, `get_table_relationships`
//! - `data`: `get_table_data`, `get_unique_values`
//! - `query`: `execute_read_query`, `execute_query`
//! - `format`: JSON, ASCII and Markdown rendering of row results

pub mod classifier;
pub mod data;
pub mod format;
pub mod identifier;
pub mod query;
pub mod schema;

use crate::db::{CatalogIntrospector, Database, PolicyEnforcer};
use crate::models::ExecutionPolicy;
use std::sync::Arc;

pub use classifier::{KeywordClassifier, StatementClassifier};
pub use data::{
    DataToolHandler, GetTableDataInput, GetUniqueValuesInput, UniqueValuesOutput, ValueFrequency,
};
pub use format::{OutputFormat, QueryOutput};
pub use identifier::{
    SimpleIdentifier, ValidatedIdentifier, validate_identifier, validate_simple_identifier,
};
pub use query::{ExecuteQueryInput, QueryToolHandler};
pub use schema::{
    DescribeTableInput, ListSchemasOutput, ListTablesInput, ListTablesOutput, RelationshipsOutput,
    SchemaToolHandler,
};

/// Everything a tool handler needs, built once at startup.
///
/// Cloning is cheap; the database handle is shared.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub database: Arc<Database>,
    pub enforcer: PolicyEnforcer,
    pub catalog: CatalogIntrospector,
    pub classifier: Arc<dyn StatementClassifier>,
}

impl ToolContext {
    pub fn new(database: Arc<Database>, policy: ExecutionPolicy) -> Self {
        let classifier = Arc::new(KeywordClassifier::new(database.dialect()));
        Self::with_classifier(database, policy, classifier)
    }

    pub fn with_classifier(
        database: Arc<Database>,
        policy: ExecutionPolicy,
        classifier: Arc<dyn StatementClassifier>,
    ) -> Self {
        Self {
            enforcer: PolicyEnforcer::new(database.clone(), policy),
            catalog: CatalogIntrospector::new(database.clone(), policy),
            database,
            classifier,
        }
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        self.enforcer.policy()
    }
}

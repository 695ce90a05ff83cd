//! Data models for the SQL gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod policy;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionProfile, Dialect, masked_connection_string};
pub use policy::{DEFAULT_MAX_RESULT_ROWS, DEFAULT_QUERY_TIMEOUT_SECS, ExecutionPolicy};
pub use query::{ClassifiedStatement, QueryResult, StatementIntent};
pub use schema::{
    ColumnDescriptor, ForeignKeyDescriptor, ForeignKeyRow, IndexDescriptor, ReferencedBy,
    TableDescriptor, TableRelationships, TableSummary, TableType, group_foreign_keys,
    relationships_by_table,
};

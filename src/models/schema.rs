//! Schema-related data models.
//!
//! These types are rebuilt from live catalog metadata on every call.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of database table object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    Table,
    View,
    MaterializedView,
}

impl TableType {
    /// Parse table type from database-specific string.
    pub fn parse(s: &str) -> Self {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "view" | "system view" => Self::View,
            "materialized view" | "matview" => Self::MaterializedView,
            _ => Self::Table,
        }
    }
}

impl std::fmt::Display for TableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::View => write!(f, "view"),
            Self::MaterializedView => write!(f, "materialized_view"),
        }
    }
}

/// One entry of `list_tables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
    pub table_type: TableType,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
}

impl TableDescriptor {
    /// Get the fully qualified table name.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type as the catalog reports it (e.g., `varchar(30)`, `INTEGER`)
    pub data_type: String,
    pub nullable: bool,
    /// Default expression, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
}

/// One row of a flattened foreign-key catalog query.
///
/// Rows must arrive ordered by constraint and then by column position.
#[derive(Debug, Clone)]
pub struct ForeignKeyRow {
    pub schema: Option<String>,
    pub table: String,
    /// Catalog-specific key that identifies the constraint within its table.
    pub constraint_key: String,
    pub name: Option<String>,
    pub column: String,
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Fold per-column rows into one descriptor per constraint, keeping row order.
pub fn group_foreign_keys(rows: Vec<ForeignKeyRow>) -> Vec<ForeignKeyDescriptor> {
    let mut out: Vec<ForeignKeyDescriptor> = Vec::new();
    let mut last_key: Option<(Option<String>, String, String)> = None;

    for row in rows {
        let key = (row.schema.clone(), row.table.clone(), row.constraint_key.clone());
        if last_key.as_ref() == Some(&key) {
            if let Some(fk) = out.last_mut() {
                fk.columns.push(row.column);
                fk.referenced_columns.push(row.referenced_column);
                continue;
            }
        }
        out.push(ForeignKeyDescriptor {
            schema: row.schema,
            table: row.table,
            name: row.name,
            columns: vec![row.column],
            referenced_schema: row.referenced_schema,
            referenced_table: row.referenced_table,
            referenced_columns: vec![row.referenced_column],
        });
        last_key = Some(key);
    }
    out
}

/// Inbound link shown under the referenced table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReferencedBy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
    pub referenced_columns: Vec<String>,
}

/// Outbound and inbound foreign keys of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableRelationships {
    pub references: Vec<ForeignKeyDescriptor>,
    pub referenced_by: Vec<ReferencedBy>,
}

/// Index foreign keys by qualified table name.
///
/// Uses a BTreeMap so the output order is stable across calls.
pub fn relationships_by_table(
    foreign_keys: &[ForeignKeyDescriptor],
) -> BTreeMap<String, TableRelationships> {
    let mut map: BTreeMap<String, TableRelationships> = BTreeMap::new();
    for fk in foreign_keys {
        map.entry(qualify(fk.schema.as_deref(), &fk.table))
            .or_default()
            .references
            .push(fk.clone());

        let target_schema = fk.referenced_schema.as_deref().or(fk.schema.as_deref());
        map.entry(qualify(target_schema, &fk.referenced_table))
            .or_default()
            .referenced_by
            .push(ReferencedBy {
                schema: fk.schema.clone(),
                table: fk.table.clone(),
                columns: fk.columns.clone(),
                referenced_columns: fk.referenced_columns.clone(),
            });
    }
    map
}

fn qualify(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(s) => format!("{s}.{table}"),
        None => table.to_string(),
    }
}

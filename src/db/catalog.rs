//! Catalog introspection.
//!
//! Each dialect implements [`CatalogBackend`] against its own system catalogs:
//! `pg_catalog` for PostgreSQL, `information_schema` for MySQL and the pragma
//! table-valued functions for SQLite. [`CatalogIntrospector`] picks the
//! backend for the connected pool, checks that requested schemas exist and
//! bounds every call by the query timeout.
//!
//! Nothing is cached; every call re-reads live metadata.

use crate::db::pool::Database;
use crate::error::{ToolError, ToolResult};
use crate::models::{
    ColumnDescriptor, ExecutionPolicy, ForeignKeyDescriptor, ForeignKeyRow, IndexDescriptor,
    TableDescriptor, TableSummary, group_foreign_keys,
};
use crate::tools::identifier::{SimpleIdentifier, ValidatedIdentifier};
use std::future::Future;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::debug;

/// Catalog queries for one dialect.
///
/// `schema` arguments are plain names that already passed identifier
/// validation; they are always bound as parameters, never interpolated.
pub trait CatalogBackend: Send + Sync {
    /// User-visible schema names, system schemas excluded, sorted.
    fn list_schemas(&self) -> impl Future<Output = ToolResult<Vec<String>>> + Send;

    fn schema_exists(&self, schema: &str) -> impl Future<Output = ToolResult<bool>> + Send;

    /// Tables and views, sorted by schema then name.
    fn list_tables(
        &self,
        schema: Option<&str>,
    ) -> impl Future<Output = ToolResult<Vec<TableSummary>>> + Send;

    /// Columns in declaration order; empty when the table does not exist.
    fn columns(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> impl Future<Output = ToolResult<Vec<ColumnDescriptor>>> + Send;

    /// Indexes sorted by name, columns in key order.
    fn indexes(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> impl Future<Output = ToolResult<Vec<IndexDescriptor>>> + Send;

    /// One row per foreign-key column, ordered by schema, table, constraint
    /// and column position. `None` filters mean every visible schema/table.
    fn foreign_key_rows(
        &self,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> impl Future<Output = ToolResult<Vec<ForeignKeyRow>>> + Send;

    /// Full description of a table, or `None` when it does not exist.
    fn describe_table(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> impl Future<Output = ToolResult<Option<TableDescriptor>>> + Send {
        async move {
            let columns = self.columns(schema, table).await?;
            if columns.is_empty() {
                return Ok(None);
            }
            let indexes = self.indexes(schema, table).await?;
            let foreign_keys = group_foreign_keys(self.foreign_key_rows(schema, Some(table)).await?);

            let primary_key = match indexes.iter().find(|i| i.primary) {
                Some(pk) => pk.columns.clone(),
                None => columns
                    .iter()
                    .filter(|c| c.primary_key)
                    .map(|c| c.name.clone())
                    .collect(),
            };

            Ok(Some(TableDescriptor {
                schema: schema.map(String::from),
                name: table.to_string(),
                columns,
                primary_key,
                foreign_keys,
                indexes,
            }))
        }
    }
}

/// Dialect-independent entry point used by the tools.
#[derive(Debug, Clone)]
pub struct CatalogIntrospector {
    database: Arc<Database>,
    policy: ExecutionPolicy,
}

impl CatalogIntrospector {
    pub fn new(database: Arc<Database>, policy: ExecutionPolicy) -> Self {
        Self { database, policy }
    }

    pub async fn list_schemas(&self) -> ToolResult<Vec<String>> {
        self.bounded("list_schemas", async {
            crate::impl_db_dispatch!(self.database.pool(), {
                MySql(p) => mysql::MysqlCatalog(p).list_schemas().await,
                Postgres(p) => postgres::PostgresCatalog(p).list_schemas().await,
                SQLite(p) => sqlite::SqliteCatalog(p).list_schemas().await,
            })
        })
        .await
    }

    pub async fn list_tables(&self, schema: Option<&SimpleIdentifier>) -> ToolResult<Vec<TableSummary>> {
        let schema = schema.map(SimpleIdentifier::as_str);
        self.bounded("list_tables", async {
            crate::impl_db_dispatch!(self.database.pool(), {
                MySql(p) => tables_in(&mysql::MysqlCatalog(p), schema).await,
                Postgres(p) => tables_in(&postgres::PostgresCatalog(p), schema).await,
                SQLite(p) => tables_in(&sqlite::SqliteCatalog(p), schema).await,
            })
        })
        .await
    }

    /// Describe `table`, falling back to the profile's default schema.
    pub async fn describe_table(&self, table: &ValidatedIdentifier) -> ToolResult<TableDescriptor> {
        let explicit = table.schema().map(SimpleIdentifier::as_str);
        let schema = explicit.or(self.database.profile().default_schema.as_deref());
        let name = table.name().as_str();
        self.bounded("describe_table", async {
            crate::impl_db_dispatch!(self.database.pool(), {
                MySql(p) => describe_in(&mysql::MysqlCatalog(p), explicit, schema, name).await,
                Postgres(p) => describe_in(&postgres::PostgresCatalog(p), explicit, schema, name).await,
                SQLite(p) => describe_in(&sqlite::SqliteCatalog(p), explicit, schema, name).await,
            })
        })
        .await
    }

    /// Every foreign key of every visible table, in a stable order.
    pub async fn get_table_relationships(&self) -> ToolResult<Vec<ForeignKeyDescriptor>> {
        let rows = self
            .bounded("get_table_relationships", async {
                crate::impl_db_dispatch!(self.database.pool(), {
                    MySql(p) => mysql::MysqlCatalog(p).foreign_key_rows(None, None).await,
                    Postgres(p) => postgres::PostgresCatalog(p).foreign_key_rows(None, None).await,
                    SQLite(p) => sqlite::SqliteCatalog(p).foreign_key_rows(None, None).await,
                })
            })
            .await?;
        Ok(group_foreign_keys(rows))
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = ToolResult<T>>,
    ) -> ToolResult<T> {
        let secs = self.policy.query_timeout_secs;
        match timeout(self.policy.query_timeout(), fut).await {
            Ok(result) => result.map_err(|e| e.with_timeout_secs(secs)),
            Err(_) => Err(ToolError::timeout(operation, secs)),
        }
    }
}

async fn require_schema<B: CatalogBackend>(backend: &B, schema: &str) -> ToolResult<()> {
    if backend.schema_exists(schema).await? {
        return Ok(());
    }
    Err(ToolError::not_found_with_hint(
        "Schema",
        schema,
        "Use list_schemas to see the available schemas",
    ))
}

async fn tables_in<B: CatalogBackend>(
    backend: &B,
    schema: Option<&str>,
) -> ToolResult<Vec<TableSummary>> {
    if let Some(schema) = schema {
        require_schema(backend, schema).await?;
    }
    let tables = backend.list_tables(schema).await?;
    debug!(count = tables.len(), schema = ?schema, "Listed tables");
    Ok(tables)
}

async fn describe_in<B: CatalogBackend>(
    backend: &B,
    explicit: Option<&str>,
    schema: Option<&str>,
    table: &str,
) -> ToolResult<TableDescriptor> {
    if let Some(explicit) = explicit {
        require_schema(backend, explicit).await?;
    }
    backend.describe_table(schema, table).await?.ok_or_else(|| {
        let name = match schema {
            Some(s) => format!("{s}.{table}"),
            None => table.to_string(),
        };
        ToolError::not_found_with_hint(
            "Table",
            name,
            "Use list_tables to see the tables in this schema",
        )
    })
}

/// `(index name, column, unique, primary)`, one row per indexed column.
type IndexRow = (String, String, bool, bool);

/// Fold per-column index rows into descriptors, keeping row order.
fn group_indexes(rows: impl IntoIterator<Item = IndexRow>) -> Vec<IndexDescriptor> {
    let mut out: Vec<IndexDescriptor> = Vec::new();
    for (name, column, unique, primary) in rows {
        match out.last_mut() {
            Some(last) if last.name == name => last.columns.push(column),
            _ => out.push(IndexDescriptor {
                name,
                columns: vec![column],
                unique,
                primary,
            }),
        }
    }
    out
}

mod postgres {
    use super::*;
    use crate::models::TableType;
    use sqlx::{PgPool, Row};

    const NOT_SYSTEM: &str = "n.nspname !~ '^pg_' AND n.nspname <> 'information_schema'";

    pub struct PostgresCatalog<'a>(pub &'a PgPool);

    impl CatalogBackend for PostgresCatalog<'_> {
        async fn list_schemas(&self) -> ToolResult<Vec<String>> {
            let sql = format!(
                "SELECT n.nspname::text FROM pg_namespace n WHERE {NOT_SYSTEM} ORDER BY n.nspname"
            );
            Ok(sqlx::query_scalar(&sql).fetch_all(self.0).await?)
        }

        async fn schema_exists(&self, schema: &str) -> ToolResult<bool> {
            Ok(sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)",
            )
            .bind(schema)
            .fetch_one(self.0)
            .await?)
        }

        async fn list_tables(&self, schema: Option<&str>) -> ToolResult<Vec<TableSummary>> {
            let sql = format!(
                r#"
                SELECT n.nspname::text AS schema_name,
                       c.relname::text AS table_name,
                       CASE c.relkind
                           WHEN 'v' THEN 'view'
                           WHEN 'm' THEN 'materialized view'
                           ELSE 'table'
                       END AS table_type
                FROM pg_class c
                JOIN pg_namespace n ON n.oid = c.relnamespace
                WHERE c.relkind IN ('r', 'p', 'v', 'm', 'f')
                  AND NOT c.relispartition
                  AND {NOT_SYSTEM}
                  AND ($1::text IS NULL OR n.nspname = $1)
                ORDER BY n.nspname, c.relname
                "#
            );
            let rows = sqlx::query(&sql).bind(schema).fetch_all(self.0).await?;
            rows.iter()
                .map(|row| {
                    Ok(TableSummary {
                        schema: Some(row.try_get("schema_name")?),
                        name: row.try_get("table_name")?,
                        table_type: TableType::parse(row.try_get("table_type")?),
                    })
                })
                .collect()
        }

        async fn columns(&self, schema: Option<&str>, table: &str) -> ToolResult<Vec<ColumnDescriptor>> {
            let rows = sqlx::query(
                r#"
                SELECT a.attname::text AS column_name,
                       format_type(a.atttypid, a.atttypmod) AS data_type,
                       NOT a.attnotnull AS nullable,
                       pg_get_expr(d.adbin, d.adrelid) AS column_default,
                       COALESCE(a.attnum = ANY (pk.conkey), false) AS is_primary_key
                FROM pg_attribute a
                JOIN pg_class c ON c.oid = a.attrelid
                JOIN pg_namespace n ON n.oid = c.relnamespace
                LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
                LEFT JOIN pg_constraint pk ON pk.conrelid = c.oid AND pk.contype = 'p'
                WHERE n.nspname = COALESCE($1::text, current_schema())
                  AND c.relname = $2
                  AND a.attnum > 0
                  AND NOT a.attisdropped
                ORDER BY a.attnum
                "#,
            )
            .bind(schema)
            .bind(table)
            .fetch_all(self.0)
            .await?;

            rows.iter()
                .map(|row| {
                    Ok(ColumnDescriptor {
                        name: row.try_get("column_name")?,
                        data_type: row.try_get("data_type")?,
                        nullable: row.try_get("nullable")?,
                        default: row.try_get("column_default")?,
                        primary_key: row.try_get("is_primary_key")?,
                    })
                })
                .collect()
        }

        async fn indexes(&self, schema: Option<&str>, table: &str) -> ToolResult<Vec<IndexDescriptor>> {
            let rows = sqlx::query(
                r#"
                SELECT i.relname::text AS index_name,
                       a.attname::text AS column_name,
                       ix.indisunique AS is_unique,
                       ix.indisprimary AS is_primary
                FROM pg_index ix
                JOIN pg_class i ON i.oid = ix.indexrelid
                JOIN pg_class t ON t.oid = ix.indrelid
                JOIN pg_namespace n ON n.oid = t.relnamespace
                CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
                WHERE n.nspname = COALESCE($1::text, current_schema())
                  AND t.relname = $2
                ORDER BY i.relname, k.ord
                "#,
            )
            .bind(schema)
            .bind(table)
            .fetch_all(self.0)
            .await?;

            let rows = rows
                .iter()
                .map(|row| -> ToolResult<IndexRow> {
                    Ok((
                        row.try_get("index_name")?,
                        row.try_get("column_name")?,
                        row.try_get("is_unique")?,
                        row.try_get("is_primary")?,
                    ))
                })
                .collect::<ToolResult<Vec<_>>>()?;
            Ok(group_indexes(rows))
        }

        async fn foreign_key_rows(
            &self,
            schema: Option<&str>,
            table: Option<&str>,
        ) -> ToolResult<Vec<ForeignKeyRow>> {
            let sql = format!(
                r#"
                SELECT n.nspname::text AS schema_name,
                       c.relname::text AS table_name,
                       con.oid::text AS constraint_key,
                       con.conname::text AS constraint_name,
                       a.attname::text AS column_name,
                       rn.nspname::text AS referenced_schema,
                       rc.relname::text AS referenced_table,
                       ra.attname::text AS referenced_column
                FROM pg_constraint con
                JOIN pg_class c ON c.oid = con.conrelid
                JOIN pg_namespace n ON n.oid = c.relnamespace
                JOIN pg_class rc ON rc.oid = con.confrelid
                JOIN pg_namespace rn ON rn.oid = rc.relnamespace
                CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, refattnum, ord)
                JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
                JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.refattnum
                WHERE con.contype = 'f'
                  AND {NOT_SYSTEM}
                  AND ($1::text IS NULL OR n.nspname = $1)
                  AND ($2::text IS NULL OR c.relname = $2)
                ORDER BY n.nspname, c.relname, con.oid, k.ord
                "#
            );
            let rows = sqlx::query(&sql)
                .bind(schema)
                .bind(table)
                .fetch_all(self.0)
                .await?;

            rows.iter()
                .map(|row| {
                    Ok(ForeignKeyRow {
                        schema: Some(row.try_get("schema_name")?),
                        table: row.try_get("table_name")?,
                        constraint_key: row.try_get("constraint_key")?,
                        name: Some(row.try_get("constraint_name")?),
                        column: row.try_get("column_name")?,
                        referenced_schema: Some(row.try_get("referenced_schema")?),
                        referenced_table: row.try_get("referenced_table")?,
                        referenced_column: row.try_get("referenced_column")?,
                    })
                })
                .collect()
        }
    }
}

mod mysql {
    use super::*;
    use crate::models::TableType;
    use sqlx::{MySqlPool, Row};

    const NOT_SYSTEM: &str = "NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')";

    pub struct MysqlCatalog<'a>(pub &'a MySqlPool);

    impl CatalogBackend for MysqlCatalog<'_> {
        async fn list_schemas(&self) -> ToolResult<Vec<String>> {
            let sql = format!(
                "SELECT CONVERT(SCHEMA_NAME USING utf8mb4) FROM information_schema.SCHEMATA \
                 WHERE SCHEMA_NAME {NOT_SYSTEM} ORDER BY SCHEMA_NAME"
            );
            Ok(sqlx::query_scalar(&sql).fetch_all(self.0).await?)
        }

        async fn schema_exists(&self, schema: &str) -> ToolResult<bool> {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?",
            )
            .bind(schema)
            .fetch_one(self.0)
            .await?;
            Ok(count > 0)
        }

        async fn list_tables(&self, schema: Option<&str>) -> ToolResult<Vec<TableSummary>> {
            let sql = format!(
                r#"
                SELECT CONVERT(TABLE_SCHEMA USING utf8mb4) AS TABLE_SCHEMA,
                       CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME,
                       CONVERT(TABLE_TYPE USING utf8mb4) AS TABLE_TYPE
                FROM information_schema.TABLES
                WHERE TABLE_TYPE IN ('BASE TABLE', 'VIEW')
                  AND TABLE_SCHEMA {NOT_SYSTEM}
                  AND (? IS NULL OR TABLE_SCHEMA = ?)
                ORDER BY TABLE_SCHEMA, TABLE_NAME
                "#
            );
            let rows = sqlx::query(&sql)
                .bind(schema)
                .bind(schema)
                .fetch_all(self.0)
                .await?;
            rows.iter()
                .map(|row| {
                    let table_type: String = row.try_get("TABLE_TYPE")?;
                    Ok(TableSummary {
                        schema: Some(row.try_get("TABLE_SCHEMA")?),
                        name: row.try_get("TABLE_NAME")?,
                        table_type: TableType::parse(&table_type),
                    })
                })
                .collect()
        }

        async fn columns(&self, schema: Option<&str>, table: &str) -> ToolResult<Vec<ColumnDescriptor>> {
            let rows = sqlx::query(
                r#"
                SELECT CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
                       CONVERT(COLUMN_TYPE USING utf8mb4) AS COLUMN_TYPE,
                       CONVERT(IS_NULLABLE USING utf8mb4) AS IS_NULLABLE,
                       CONVERT(COLUMN_DEFAULT USING utf8mb4) AS COLUMN_DEFAULT,
                       CONVERT(COLUMN_KEY USING utf8mb4) AS COLUMN_KEY
                FROM information_schema.COLUMNS
                WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?
                ORDER BY ORDINAL_POSITION
                "#,
            )
            .bind(schema)
            .bind(table)
            .fetch_all(self.0)
            .await?;

            rows.iter()
                .map(|row| {
                    let nullable: String = row.try_get("IS_NULLABLE")?;
                    let key: Option<String> = row.try_get("COLUMN_KEY")?;
                    Ok(ColumnDescriptor {
                        name: row.try_get("COLUMN_NAME")?,
                        data_type: row.try_get("COLUMN_TYPE")?,
                        nullable: nullable == "YES",
                        default: row.try_get("COLUMN_DEFAULT")?,
                        primary_key: key.as_deref() == Some("PRI"),
                    })
                })
                .collect()
        }

        async fn indexes(&self, schema: Option<&str>, table: &str) -> ToolResult<Vec<IndexDescriptor>> {
            let rows = sqlx::query(
                r#"
                SELECT CONVERT(INDEX_NAME USING utf8mb4) AS INDEX_NAME,
                       CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
                       CAST(NON_UNIQUE AS SIGNED) AS NON_UNIQUE
                FROM information_schema.STATISTICS
                WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?
                  AND COLUMN_NAME IS NOT NULL
                ORDER BY INDEX_NAME, SEQ_IN_INDEX
                "#,
            )
            .bind(schema)
            .bind(table)
            .fetch_all(self.0)
            .await?;

            let rows = rows
                .iter()
                .map(|row| -> ToolResult<IndexRow> {
                    let name: String = row.try_get("INDEX_NAME")?;
                    let non_unique: i64 = row.try_get("NON_UNIQUE")?;
                    let primary = name == "PRIMARY";
                    Ok((name, row.try_get("COLUMN_NAME")?, non_unique == 0, primary))
                })
                .collect::<ToolResult<Vec<_>>>()?;
            Ok(group_indexes(rows))
        }

        /// `KEY_COLUMN_USAGE` keeps no declaration order for constraints, so
        /// constraints of one table come back sorted by `CONSTRAINT_NAME`. Stable
        /// across calls, but alphabetical rather than in the order they were declared.
        async fn foreign_key_rows(
            &self,
            schema: Option<&str>,
            table: Option<&str>,
        ) -> ToolResult<Vec<ForeignKeyRow>> {
            let sql = format!(
                r#"
                SELECT CONVERT(TABLE_SCHEMA USING utf8mb4) AS TABLE_SCHEMA,
                       CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME,
                       CONVERT(CONSTRAINT_NAME USING utf8mb4) AS CONSTRAINT_NAME,
                       CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
                       CONVERT(REFERENCED_TABLE_SCHEMA USING utf8mb4) AS REFERENCED_TABLE_SCHEMA,
                       CONVERT(REFERENCED_TABLE_NAME USING utf8mb4) AS REFERENCED_TABLE_NAME,
                       CONVERT(REFERENCED_COLUMN_NAME USING utf8mb4) AS REFERENCED_COLUMN_NAME
                FROM information_schema.KEY_COLUMN_USAGE
                WHERE REFERENCED_TABLE_NAME IS NOT NULL
                  AND TABLE_SCHEMA {NOT_SYSTEM}
                  AND (? IS NULL OR TABLE_SCHEMA = ?)
                  AND (? IS NULL OR TABLE_NAME = ?)
                ORDER BY TABLE_SCHEMA, TABLE_NAME, CONSTRAINT_NAME, ORDINAL_POSITION
                "#
            );
            let rows = sqlx::query(&sql)
                .bind(schema)
                .bind(schema)
                .bind(table)
                .bind(table)
                .fetch_all(self.0)
                .await?;

            rows.iter()
                .map(|row| {
                    let name: String = row.try_get("CONSTRAINT_NAME")?;
                    Ok(ForeignKeyRow {
                        schema: Some(row.try_get("TABLE_SCHEMA")?),
                        table: row.try_get("TABLE_NAME")?,
                        constraint_key: name.clone(),
                        name: Some(name),
                        column: row.try_get("COLUMN_NAME")?,
                        referenced_schema: row.try_get("REFERENCED_TABLE_SCHEMA")?,
                        referenced_table: row.try_get("REFERENCED_TABLE_NAME")?,
                        referenced_column: row.try_get("REFERENCED_COLUMN_NAME")?,
                    })
                })
                .collect()
        }
    }
}

mod sqlite {
    use super::*;
    use crate::models::TableType;
    use sqlx::{Row, SqlitePool};

    pub struct SqliteCatalog<'a>(pub &'a SqlitePool);

    impl CatalogBackend for SqliteCatalog<'_> {
        async fn list_schemas(&self) -> ToolResult<Vec<String>> {
            Ok(sqlx::query_scalar(
                "SELECT name FROM pragma_database_list WHERE name <> 'temp' ORDER BY name",
            )
            .fetch_all(self.0)
            .await?)
        }

        async fn schema_exists(&self, schema: &str) -> ToolResult<bool> {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM pragma_database_list WHERE name = ?1 AND name <> 'temp'",
            )
            .bind(schema)
            .fetch_one(self.0)
            .await?;
            Ok(count > 0)
        }

        async fn list_tables(&self, schema: Option<&str>) -> ToolResult<Vec<TableSummary>> {
            let rows = sqlx::query(
                r#"
                SELECT schema, name, type
                FROM pragma_table_list
                WHERE type IN ('table', 'view')
                  AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
                  AND schema <> 'temp'
                  AND (?1 IS NULL OR schema = ?1)
                ORDER BY schema, name
                "#,
            )
            .bind(schema)
            .fetch_all(self.0)
            .await?;

            rows.iter()
                .map(|row| {
                    let table_type: String = row.try_get("type")?;
                    Ok(TableSummary {
                        schema: Some(row.try_get("schema")?),
                        name: row.try_get("name")?,
                        table_type: TableType::parse(&table_type),
                    })
                })
                .collect()
        }

        async fn columns(&self, schema: Option<&str>, table: &str) -> ToolResult<Vec<ColumnDescriptor>> {
            let rows = sqlx::query(
                r#"
                SELECT name, type, "notnull", dflt_value, pk
                FROM pragma_table_info(?1, ?2)
                ORDER BY cid
                "#,
            )
            .bind(table)
            .bind(schema.unwrap_or("main"))
            .fetch_all(self.0)
            .await?;

            rows.iter()
                .map(|row| {
                    let not_null: i64 = row.try_get("notnull")?;
                    let pk: i64 = row.try_get("pk")?;
                    Ok(ColumnDescriptor {
                        name: row.try_get("name")?,
                        data_type: row.try_get("type")?,
                        nullable: not_null == 0,
                        default: row.try_get("dflt_value")?,
                        primary_key: pk > 0,
                    })
                })
                .collect()
        }

        async fn indexes(&self, schema: Option<&str>, table: &str) -> ToolResult<Vec<IndexDescriptor>> {
            let rows = sqlx::query(
                r#"
                SELECT il.name AS index_name,
                       ii.name AS column_name,
                       il."unique" AS is_unique,
                       il.origin AS origin
                FROM pragma_index_list(?1, ?2) AS il
                JOIN pragma_index_info(il.name, ?2) AS ii
                WHERE ii.name IS NOT NULL
                ORDER BY il.name, ii.seqno
                "#,
            )
            .bind(table)
            .bind(schema.unwrap_or("main"))
            .fetch_all(self.0)
            .await?;

            let mut indexes = group_indexes(
                rows.iter()
                    .map(|row| -> ToolResult<IndexRow> {
                        let unique: i64 = row.try_get("is_unique")?;
                        let origin: String = row.try_get("origin")?;
                        Ok((
                            row.try_get("index_name")?,
                            row.try_get("column_name")?,
                            unique != 0,
                            origin == "pk",
                        ))
                    })
                    .collect::<ToolResult<Vec<_>>>()?,
            );

            // INTEGER PRIMARY KEY is the rowid and has no index entry
            if !indexes.iter().any(|i| i.primary) {
                let pk = primary_key_columns(self.0, schema, table).await?;
                if !pk.is_empty() {
                    indexes.insert(
                        0,
                        IndexDescriptor {
                            name: "PRIMARY".to_string(),
                            columns: pk,
                            unique: true,
                            primary: true,
                        },
                    );
                }
            }
            Ok(indexes)
        }

        async fn foreign_key_rows(
            &self,
            schema: Option<&str>,
            table: Option<&str>,
        ) -> ToolResult<Vec<ForeignKeyRow>> {
            let rows = sqlx::query(
                r#"
                SELECT t.schema AS schema_name,
                       t.name AS table_name,
                       fk.id AS id,
                       fk."from" AS column_name,
                       fk."table" AS referenced_table,
                       COALESCE(
                           fk."to",
                           (SELECT p.name FROM pragma_table_info(fk."table", t.schema) AS p
                            WHERE p.pk = fk.seq + 1)
                       ) AS referenced_column
                FROM pragma_table_list AS t
                JOIN pragma_foreign_key_list(t.name, t.schema) AS fk
                WHERE t.type = 'table'
                  AND t.schema <> 'temp'
                  AND (?1 IS NULL OR t.schema = ?1)
                  AND (?2 IS NULL OR t.name = ?2)
                ORDER BY t.schema, t.name, fk.id, fk.seq
                "#,
            )
            .bind(schema)
            .bind(table)
            .fetch_all(self.0)
            .await?;

            rows.iter()
                .map(|row| {
                    let schema: String = row.try_get("schema_name")?;
                    let id: i64 = row.try_get("id")?;
                    let referenced_column: Option<String> = row.try_get("referenced_column")?;
                    Ok(ForeignKeyRow {
                        referenced_schema: Some(schema.clone()),
                        schema: Some(schema),
                        table: row.try_get("table_name")?,
                        constraint_key: id.to_string(),
                        name: None,
                        column: row.try_get("column_name")?,
                        referenced_table: row.try_get("referenced_table")?,
                        referenced_column: referenced_column.unwrap_or_default(),
                    })
                })
                .collect()
        }
    }

    async fn primary_key_columns(
        pool: &SqlitePool,
        schema: Option<&str>,
        table: &str,
    ) -> ToolResult<Vec<String>> {
        Ok(sqlx::query_scalar(
            "SELECT name FROM pragma_table_info(?1, ?2) WHERE pk > 0 ORDER BY pk",
        )
        .bind(table)
        .bind(schema.unwrap_or("main"))
        .fetch_all(pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::pool::SessionSettings;
    use crate::error::ErrorKind;
    use crate::models::TableType;
    use crate::tools::identifier::{validate_identifier, validate_simple_identifier};
    use std::time::Duration;
    use tempfile::TempDir;

    const FIXTURE: &str = r#"
        CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE, status TEXT DEFAULT 'active');
        CREATE TABLE products (sku TEXT, variant INTEGER, name TEXT, PRIMARY KEY (sku, variant));
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            sku TEXT,
            variant INTEGER,
            FOREIGN KEY (sku, variant) REFERENCES products(sku, variant)
        );
        CREATE INDEX idx_orders_user ON orders(user_id);
        CREATE VIEW active_users AS SELECT * FROM users WHERE status = 'active';
    "#;

    async fn introspector() -> (TempDir, CatalogIntrospector) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("catalog.db").display());
        let config = DatabaseConfig::parse(&url).unwrap();
        let policy = ExecutionPolicy {
            read_only: false,
            ..Default::default()
        };
        let settings = SessionSettings {
            application_name: "test".into(),
            schema: None,
            connect_timeout: Duration::from_secs(5),
        };
        let db = Database::connect(&config, &policy, &settings).await.unwrap();
        if let crate::db::pool::DbPool::SQLite(pool) = db.pool() {
            sqlx::raw_sql(FIXTURE).execute(pool).await.unwrap();
        }
        (dir, CatalogIntrospector::new(Arc::new(db), policy))
    }

    #[tokio::test]
    async fn test_list_schemas_and_tables() {
        let (_dir, catalog) = introspector().await;
        assert_eq!(catalog.list_schemas().await.unwrap(), vec!["main"]);

        let tables = catalog.list_tables(None).await.unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["active_users", "orders", "products", "users"]);
        assert_eq!(tables[0].table_type, TableType::View);
        assert_eq!(tables[1].schema.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_unknown_schema_is_not_found() {
        let (_dir, catalog) = introspector().await;
        let missing = validate_simple_identifier("nope").unwrap();
        let err = catalog.list_tables(Some(&missing)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = catalog
            .describe_table(&validate_identifier("nope.users").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_describe_table() {
        let (_dir, catalog) = introspector().await;
        let users = catalog
            .describe_table(&validate_identifier("users").unwrap())
            .await
            .unwrap();

        assert_eq!(users.schema.as_deref(), Some("main"));
        assert_eq!(users.column_names(), vec!["id", "email", "status"]);
        assert_eq!(users.primary_key, vec!["id"]);
        assert!(!users.columns[1].nullable);
        assert_eq!(users.columns[2].default.as_deref(), Some("'active'"));
        assert!(users.indexes.iter().any(|i| i.unique && i.columns == vec!["email"]));

        let products = catalog
            .describe_table(&validate_identifier("main.products").unwrap())
            .await
            .unwrap();
        assert_eq!(products.primary_key, vec!["sku", "variant"]);
    }

    #[tokio::test]
    async fn test_describe_missing_table() {
        let (_dir, catalog) = introspector().await;
        let err = catalog
            .describe_table(&validate_identifier("ghosts").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("ghosts"));
    }

    #[tokio::test]
    async fn test_foreign_keys_grouped_and_stable() {
        let (_dir, catalog) = introspector().await;
        let first = catalog.get_table_relationships().await.unwrap();
        let second = catalog.get_table_relationships().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);

        let composite = first.iter().find(|fk| fk.referenced_table == "products").unwrap();
        assert_eq!(composite.columns, vec!["sku", "variant"]);
        assert_eq!(composite.referenced_columns, vec!["sku", "variant"]);

        let to_users = first.iter().find(|fk| fk.referenced_table == "users").unwrap();
        assert_eq!(to_users.columns, vec!["user_id"]);

        let orders = catalog
            .describe_table(&validate_identifier("orders").unwrap())
            .await
            .unwrap();
        assert_eq!(orders.foreign_keys.len(), 2);
        assert!(orders.indexes.iter().any(|i| i.name == "idx_orders_user"));
    }
}

//! Execution policy enforcement.
//!
//! Every statement that reaches the database passes through
//! [`PolicyEnforcer`]. It decides whether a classified statement may run under
//! the active [`ExecutionPolicy`], then executes it on a dedicated pooled
//! connection under the query timeout:
//!
//! - read-only statements stream rows and stop after `cap + 1`
//! - everything else runs in a transaction that is committed only on success,
//!   with the stream drained so `rows_affected` is exact
//!
//! A statement that outlives its budget has its connection detached from the
//! pool instead of returned, so an abandoned query can never leak into a later
//! call.

use crate::db::pool::{Database, DbConnection, clear_sqlite_deadline, install_sqlite_deadline};
use crate::error::{ToolError, ToolResult};
use crate::models::{ClassifiedStatement, ExecutionPolicy, QueryResult};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How a statement is run once admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Stream rows, stop after `cap + 1`, no transaction.
    Read,
    /// Transaction, drain the stream, report rows affected.
    Write,
}

/// Gatekeeper between tool calls and the database.
#[derive(Debug, Clone)]
pub struct PolicyEnforcer {
    database: Arc<Database>,
    policy: ExecutionPolicy,
}

impl PolicyEnforcer {
    pub fn new(database: Arc<Database>, policy: ExecutionPolicy) -> Self {
        Self { database, policy }
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Decide whether `statement` may run.
    ///
    /// `require_read_only` tightens the policy for tools that only ever read,
    /// regardless of the server mode.
    pub fn authorize(
        &self,
        statement: &ClassifiedStatement,
        require_read_only: bool,
    ) -> ToolResult<RunMode> {
        if statement.is_empty() {
            return Err(ToolError::invalid_input("sql must contain a statement"));
        }
        if statement.is_stacked() {
            return Err(ToolError::multiple_statements(statement.statement_count));
        }
        if statement.is_read_only() {
            return Ok(RunMode::Read);
        }
        if self.policy.read_only || require_read_only {
            let operation = if statement.keyword.is_empty() {
                statement.intent.to_string()
            } else {
                statement.keyword.clone()
            };
            return Err(ToolError::read_only_violation(operation));
        }
        Ok(RunMode::Write)
    }

    /// Authorize and run a free-form statement.
    pub async fn execute(
        &self,
        statement: &ClassifiedStatement,
        limit: Option<i64>,
        require_read_only: bool,
    ) -> ToolResult<QueryResult> {
        let mode = self.authorize(statement, require_read_only)?;
        let cap = self.policy.result_cap(limit);
        debug!(sql = %statement.sql, intent = %statement.intent, ?mode, cap, "Executing statement");
        self.run(&statement.sql, cap, mode).await
    }

    /// Run SQL the gateway generated itself from validated identifiers.
    pub async fn fetch_generated(&self, sql: &str, cap: usize) -> ToolResult<QueryResult> {
        debug!(sql = %sql, cap, "Executing generated query");
        self.run(sql, cap, RunMode::Read).await
    }

    async fn run(&self, sql: &str, cap: usize, mode: RunMode) -> ToolResult<QueryResult> {
        let start = Instant::now();
        let budget = self.policy.query_timeout();
        let mut conn = self.database.acquire().await?;

        if let DbConnection::SQLite(c) = &mut conn {
            install_sqlite_deadline(c, budget).await?;
        }

        let outcome = timeout(budget, run_on(&mut conn, sql, cap, mode)).await;

        let fetched = match outcome {
            Ok(result) => {
                if let DbConnection::SQLite(c) = &mut conn {
                    clear_sqlite_deadline(c).await;
                }
                result.map_err(|e| e.with_timeout_secs(self.policy.query_timeout_secs))?
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.policy.query_timeout_secs,
                    ?mode,
                    "Statement timed out, discarding connection"
                );
                conn.discard();
                return Err(ToolError::timeout(
                    match mode {
                        RunMode::Read => "query",
                        RunMode::Write => "statement",
                    },
                    self.policy.query_timeout_secs,
                ));
            }
        };

        let elapsed = start.elapsed().as_millis() as u64;
        let mut result = QueryResult::from_rows(fetched.columns, fetched.rows, cap, elapsed);
        if mode == RunMode::Write {
            result.rows_affected = Some(fetched.rows_affected);
        }

        info!(
            ?mode,
            row_count = result.row_count,
            truncated = result.truncated,
            rows_affected = ?result.rows_affected,
            execution_time_ms = elapsed,
            "Statement finished"
        );
        Ok(result)
    }
}

/// Rows collected from one statement, at most `cap + 1` of them.
#[derive(Debug, Default)]
struct Fetched {
    columns: Vec<String>,
    rows: Vec<serde_json::Map<String, serde_json::Value>>,
    rows_affected: u64,
}

async fn run_on(
    conn: &mut DbConnection,
    sql: &str,
    cap: usize,
    mode: RunMode,
) -> ToolResult<Fetched> {
    match conn {
        DbConnection::MySql(c) => mysql::run(c, sql, cap, mode).await,
        DbConnection::Postgres(c) => postgres::run(c, sql, cap, mode).await,
        DbConnection::SQLite(c) => sqlite::run(c, sql, cap, mode).await,
    }
}

/// Generate a statement runner bound to one driver's concrete connection type.
macro_rules! dialect_runner {
    ($module:ident, $db:ty, $connection:ty) => {
        mod $module {
            use super::{Fetched, RunMode};
            use crate::db::types::{RowToJson, RowsAffected};
            use crate::error::ToolResult;
            use futures_util::TryStreamExt;
            use sqlx::pool::PoolConnection;
            use sqlx::{Column, Connection, Either, Executor, Statement};
            use tracing::debug;

            pub(super) async fn run(
                conn: &mut PoolConnection<$db>,
                sql: &str,
                cap: usize,
                mode: RunMode,
            ) -> ToolResult<Fetched> {
                match mode {
                    RunMode::Read => {
                        let mut fetched = fetch_capped(&mut **conn, sql, cap, false).await?;
                        if fetched.columns.is_empty() {
                            fetched.columns = result_columns(&mut **conn, sql).await;
                        }
                        Ok(fetched)
                    }
                    RunMode::Write => {
                        let mut tx = Connection::begin(&mut **conn).await?;
                        let fetched = fetch_capped(&mut *tx, sql, cap, true).await?;
                        tx.commit().await?;
                        Ok(fetched)
                    }
                }
            }

            /// Stream a statement, keeping at most `cap + 1` rows.
            ///
            /// With `drain` the stream is consumed to the end so every affected-row
            /// count is seen; otherwise it is dropped as soon as the extra row arrives.
            async fn fetch_capped(
                conn: &mut $connection,
                sql: &str,
                cap: usize,
                drain: bool,
            ) -> ToolResult<Fetched> {
                let mut stream = (&mut *conn).fetch_many(sql);
                let mut fetched = Fetched::default();

                while let Some(item) = stream.try_next().await? {
                    match item {
                        Either::Left(done) => fetched.rows_affected += done.affected(),
                        Either::Right(row) => {
                            if fetched.columns.is_empty() {
                                fetched.columns = row.column_names();
                            }
                            if fetched.rows.len() <= cap {
                                fetched.rows.push(row.to_json_map());
                            }
                            if !drain && fetched.rows.len() > cap {
                                break;
                            }
                        }
                    }
                }
                Ok(fetched)
            }

            /// Column names of a statement that returned no rows.
            async fn result_columns(conn: &mut $connection, sql: &str) -> Vec<String> {
                match (&mut *conn).prepare(sql).await {
                    Ok(statement) => statement
                        .columns()
                        .iter()
                        .map(|c| c.name().to_string())
                        .collect(),
                    Err(e) => {
                        debug!(error = %e, "Could not prepare statement to read its columns");
                        Vec::new()
                    }
                }
            }
        }
    };
}

dialect_runner!(mysql, sqlx::MySql, sqlx::MySqlConnection);
dialect_runner!(postgres, sqlx::Postgres, sqlx::PgConnection);
dialect_runner!(sqlite, sqlx::Sqlite, sqlx::SqliteConnection);

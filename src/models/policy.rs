//! Execution policy shared by every tool.

use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_MAX_RESULT_ROWS: u32 = 25;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Limits applied to every statement the gateway runs.
///
/// Loaded once at startup and passed by reference; nothing mutates it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionPolicy {
    /// When true, only statements classified as read-only reach the database.
    pub read_only: bool,
    /// Upper bound on rows returned by any single call.
    pub max_result_rows: u32,
    /// Wall-clock budget for a single statement.
    pub query_timeout_secs: u64,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            read_only: true,
            max_result_rows: DEFAULT_MAX_RESULT_ROWS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

impl ExecutionPolicy {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Effective row cap for one call.
    ///
    /// A missing or non-positive request falls back to `default`; the result
    /// never exceeds `max_result_rows`.
    pub fn clamp_limit(&self, requested: Option<i64>, default: u32) -> usize {
        let max = self.max_result_rows.max(1) as i64;
        let wanted = match requested {
            Some(n) if n >= 1 => n,
            _ => default as i64,
        };
        wanted.min(max) as usize
    }

    /// Row cap for free-form queries, which default to the policy maximum.
    pub fn result_cap(&self, requested: Option<i64>) -> usize {
        self.clamp_limit(requested, self.max_result_rows)
    }
}

//! Error types for the SQL gateway.
//!
//! Every failure a tool can produce is a [`ToolError`]. Each variant maps to a
//! stable [`ErrorKind`] string that callers can match on, and to an MCP error
//! code when it crosses the protocol boundary. Raw driver text is kept only in
//! the `cause` fields, which are logged and never serialized.

use serde::Serialize;
use sqlx::error::ErrorKind as SqlxErrorKind;
use thiserror::Error;

/// Stable, caller-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidIdentifier,
    MultipleStatements,
    ReadOnlyViolation,
    Timeout,
    NotFound,
    ConnectionFailure,
    DriverError,
    ConfigurationError,
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier => "invalid_identifier",
            Self::MultipleStatements => "multiple_statements",
            Self::ReadOnlyViolation => "read_only_violation",
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
            Self::ConnectionFailure => "connection_failure",
            Self::DriverError => "driver_error",
            Self::ConfigurationError => "configuration_error",
            Self::InvalidInput => "invalid_input",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid identifier {identifier:?}: {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    #[error("Multiple statements are not allowed: found {count} statements in one request")]
    MultipleStatements { count: usize },

    #[error("Read-only mode: {operation} statements are not permitted")]
    ReadOnlyViolation { operation: String },

    #[error("Timeout: {operation} {}", describe_limit(.timeout_secs))]
    Timeout {
        operation: String,
        /// None when the database server cancelled the statement itself.
        timeout_secs: Option<u64>,
    },

    #[error("{object_type} not found: {name}")]
    NotFound {
        object_type: String,
        name: String,
        /// Shown to the caller as the suggestion, e.g. the available columns.
        hint: Option<String>,
    },

    #[error("Connection failed: {message}")]
    ConnectionFailure {
        message: String,
        cause: Option<String>,
    },

    #[error("Database error: {message}")]
    Driver {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        cause: Option<String>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl ToolError {
    pub fn invalid_identifier(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    pub fn multiple_statements(count: usize) -> Self {
        Self::MultipleStatements { count }
    }

    pub fn read_only_violation(operation: impl Into<String>) -> Self {
        Self::ReadOnlyViolation {
            operation: operation.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_secs: Some(timeout_secs),
        }
    }

    /// Attach the client-side budget to a server-side cancellation.
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        match self {
            Self::Timeout {
                operation,
                timeout_secs: None,
            } => Self::Timeout {
                operation,
                timeout_secs: Some(secs),
            },
            other => other,
        }
    }

    pub fn not_found(object_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            object_type: object_type.into(),
            name: name.into(),
            hint: None,
        }
    }

    /// Create a not-found error carrying a hint for the caller.
    pub fn not_found_with_hint(
        object_type: impl Into<String>,
        name: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            object_type: object_type.into(),
            name: name.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn connection(message: impl Into<String>, cause: Option<String>) -> Self {
        Self::ConnectionFailure {
            message: message.into(),
            cause,
        }
    }

    pub fn driver(
        message: impl Into<String>,
        sql_state: Option<String>,
        cause: Option<String>,
    ) -> Self {
        Self::Driver {
            message: message.into(),
            sql_state,
            cause,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            Self::MultipleStatements { .. } => ErrorKind::MultipleStatements,
            Self::ReadOnlyViolation { .. } => ErrorKind::ReadOnlyViolation,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ConnectionFailure { .. } => ErrorKind::ConnectionFailure,
            Self::Driver { .. } => ErrorKind::DriverError,
            Self::Configuration { .. } => ErrorKind::ConfigurationError,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Raw error text from the driver. Logged, never returned to callers.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailure { cause, .. } | Self::Driver { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }

    /// Get the suggestion for this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::InvalidIdentifier { .. } => {
                "Identifiers may contain only letters, digits and underscores, optionally as schema.table"
            }
            Self::MultipleStatements { .. } => "Submit exactly one SQL statement per call",
            Self::ReadOnlyViolation { .. } => {
                "Only SELECT, SHOW, DESCRIBE, EXPLAIN and WITH queries are allowed here; writes need execute_query on a server started with MCP_READ_ONLY=false"
            }
            Self::Timeout { .. } => {
                "Narrow the query with WHERE or LIMIT, or raise MCP_MAX_QUERY_TIMEOUT"
            }
            Self::NotFound { hint: Some(hint), .. } => hint,
            Self::NotFound { .. } => "Use list_schemas and list_tables to discover available objects",
            Self::ConnectionFailure { .. } => {
                "Check network connectivity, credentials and database server status"
            }
            Self::Driver { .. } => "Check the SQL syntax and referenced objects",
            Self::Configuration { .. } => "Check DATABASE_URL and the server options",
            Self::InvalidInput { .. } => "Check the tool arguments",
        }
    }
}

fn describe_limit(timeout_secs: &Option<u64>) -> String {
    match timeout_secs {
        Some(secs) => format!("exceeded the {secs}s query timeout"),
        None => "exceeded the query timeout".to_string(),
    }
}

/// Generic, credential-free description of a SQLSTATE class.
fn sql_state_category(code: &str) -> &'static str {
    match code.get(..2) {
        Some("08") => "connection exception",
        Some("0A") => "feature not supported",
        Some("21") => "cardinality violation",
        Some("22") => "data exception",
        Some("23") => "integrity constraint violation",
        Some("25") => "invalid transaction state",
        Some("28") => "invalid authorization",
        Some("3D") | Some("3F") => "invalid catalog or schema name",
        Some("40") => "transaction rollback",
        Some("42") => "syntax error or access rule violation",
        Some("53") => "insufficient resources",
        Some("54") => "program limit exceeded",
        Some("57") => "operator intervention",
        _ => "statement failed",
    }
}

fn is_timeout(db_err: &(dyn sqlx::error::DatabaseError + 'static), code: Option<&str>) -> bool {
    // 57014 = query_canceled (statement_timeout)
    if code == Some("57014") {
        return true;
    }
    // 3024 = ER_QUERY_TIMEOUT (max_execution_time)
    if let Some(my) = db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
        return my.number() == 3024;
    }
    // SQLITE_INTERRUPT
    db_err.try_downcast_ref::<sqlx::sqlite::SqliteError>().is_some() && code == Some("9")
}

fn is_undefined_table(
    db_err: &(dyn sqlx::error::DatabaseError + 'static),
    code: Option<&str>,
) -> bool {
    if code == Some("42P01") {
        return true;
    }
    if let Some(my) = db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
        return my.number() == 1146;
    }
    db_err.try_downcast_ref::<sqlx::sqlite::SqliteError>().is_some()
        && db_err.message().starts_with("no such table")
}

/// Convert sqlx errors to ToolError, reducing driver text to a generic category.
impl From<sqlx::Error> for ToolError {
    fn from(err: sqlx::Error) -> Self {
        let cause = Some(err.to_string());
        match &err {
            sqlx::Error::Configuration(_) => {
                ToolError::configuration("invalid database connection options")
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                if is_timeout(db_err.as_ref(), code.as_deref()) {
                    return ToolError::Timeout {
                        operation: "statement cancelled by the server".to_string(),
                        timeout_secs: None,
                    };
                }
                if is_undefined_table(db_err.as_ref(), code.as_deref()) {
                    return ToolError::not_found("Table", "referenced table");
                }
                let category = match db_err.kind() {
                    SqlxErrorKind::UniqueViolation => "unique constraint violation",
                    SqlxErrorKind::ForeignKeyViolation => "foreign key constraint violation",
                    SqlxErrorKind::NotNullViolation => "not-null constraint violation",
                    SqlxErrorKind::CheckViolation => "check constraint violation",
                    _ => code.as_deref().map_or("statement failed", sql_state_category),
                };
                ToolError::driver(category, code, cause)
            }
            sqlx::Error::RowNotFound => ToolError::driver("no rows returned", None, cause),
            sqlx::Error::PoolTimedOut => {
                ToolError::connection("timed out waiting for a pooled connection", cause)
            }
            sqlx::Error::PoolClosed => ToolError::connection("connection pool is closed", cause),
            sqlx::Error::Io(_) => ToolError::connection("I/O error talking to the database", cause),
            sqlx::Error::Tls(_) => ToolError::connection("TLS negotiation failed", cause),
            sqlx::Error::Protocol(_) => ToolError::connection("database protocol error", cause),
            sqlx::Error::WorkerCrashed => {
                ToolError::connection("database worker stopped unexpectedly", cause)
            }
            sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_) => {
                ToolError::driver("failed to decode a result value", None, cause)
            }
            _ => ToolError::driver("unexpected database error", None, cause),
        }
    }
}

/// Result type alias for gateway operations.
pub type ToolResult<T> = Result<T, ToolError>;

fn error_data(err: &ToolError) -> Option<serde_json::Value> {
    Some(serde_json::json!({
        "kind": err.kind().as_str(),
        "suggestion": err.suggestion(),
    }))
}

/// Convert ToolError to MCP ErrorData.
/// The `data` object carries the stable kind string and a suggestion.
impl From<ToolError> for rmcp::ErrorData {
    fn from(err: ToolError) -> Self {
        if let Some(cause) = err.cause() {
            tracing::warn!(kind = %err.kind(), cause, "Tool call failed");
        } else {
            tracing::debug!(kind = %err.kind(), error = %err, "Tool call rejected");
        }

        let data = error_data(&err);
        match &err {
            ToolError::InvalidIdentifier { .. }
            | ToolError::MultipleStatements { .. }
            | ToolError::ReadOnlyViolation { .. }
            | ToolError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            ToolError::Driver { sql_state, .. } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", err, code),
                    None => err.to_string(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            ToolError::NotFound { .. } => rmcp::ErrorData::resource_not_found(err.to_string(), data),

            ToolError::Timeout { .. }
            | ToolError::ConnectionFailure { .. }
            | ToolError::Configuration { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ToolError::read_only_violation("DELETE");
        assert!(err.to_string().contains("Read-only mode"));
        assert!(err.to_string().contains("DELETE"));
    }

    #[test]
    fn test_kind_strings_are_stable() {
        assert_eq!(
            ToolError::invalid_identifier("a;b", "semicolon").kind().as_str(),
            "invalid_identifier"
        );
        assert_eq!(
            ToolError::multiple_statements(2).kind().as_str(),
            "multiple_statements"
        );
        assert_eq!(ToolError::timeout("query", 30).kind().as_str(), "timeout");
        assert_eq!(
            ToolError::driver("x", None, None).kind().as_str(),
            "driver_error"
        );
    }

    #[test]
    fn test_invalid_identifier_is_escaped_in_message() {
        let err = ToolError::invalid_identifier("users\"; DROP", "quote");
        assert!(err.to_string().contains("\\\""));
    }

    #[test]
    fn test_policy_errors_map_to_invalid_params() {
        for err in [
            ToolError::invalid_identifier("x y", "whitespace"),
            ToolError::multiple_statements(2),
            ToolError::read_only_violation("INSERT"),
            ToolError::invalid_input("empty"),
        ] {
            let mcp_err: rmcp::ErrorData = err.into();
            assert_eq!(mcp_err.code.0, -32602);
        }
    }

    #[test]
    fn test_not_found_maps_to_resource_not_found() {
        let err = ToolError::not_found("Table", "missing");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_timeout_maps_to_internal_error() {
        let err = ToolError::timeout("query", 30);
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_connection_maps_to_internal_error() {
        let err = ToolError::connection("refused", Some("secret host".into()));
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_driver_error_includes_sql_state_but_not_cause() {
        let err = ToolError::driver(
            "syntax error or access rule violation",
            Some("42601".to_string()),
            Some("syntax error at or near \"password=hunter2\"".to_string()),
        );
        let mcp_err: rmcp::ErrorData = err.into();
        assert!(mcp_err.message.contains("42601"));
        assert!(!mcp_err.message.contains("hunter2"));
        let data = mcp_err.data.unwrap();
        assert!(!data.to_string().contains("hunter2"));
    }

    #[test]
    fn test_error_data_carries_kind_and_suggestion() {
        let err = ToolError::multiple_statements(3);
        let mcp_err: rmcp::ErrorData = err.into();
        let data = mcp_err.data.unwrap();
        assert_eq!(data["kind"], "multiple_statements");
        assert_eq!(data["suggestion"], "Submit exactly one SQL statement per call");
    }

    #[test]
    fn test_not_found_hint_becomes_suggestion() {
        let err = ToolError::not_found_with_hint("Column", "nope", "Available columns: id, name");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.data.unwrap()["suggestion"], "Available columns: id, name");
    }

    #[test]
    fn test_sqlx_pool_errors_are_connection_failures() {
        let err: ToolError = sqlx::Error::PoolClosed.into();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
        assert!(err.cause().is_some());
    }

    #[test]
    fn test_server_timeout_gets_client_budget() {
        let err = ToolError::Timeout {
            operation: "statement".into(),
            timeout_secs: None,
        };
        assert!(err.to_string().ends_with("exceeded the query timeout"));
        let err = err.with_timeout_secs(5);
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_sql_state_category() {
        assert_eq!(sql_state_category("42601"), "syntax error or access rule violation");
        assert_eq!(sql_state_category("23505"), "integrity constraint violation");
        assert_eq!(sql_state_category("1"), "statement failed");
    }
}

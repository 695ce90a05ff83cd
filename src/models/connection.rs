//! Connection-related data models.
//!
//! A [`ConnectionProfile`] is built once at startup from the connection string
//! and never changes for the lifetime of the process.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl Dialect {
    /// Parse the dialect from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this dialect.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Quote an already validated identifier part.
    pub(crate) fn quote(&self, ident: &str) -> String {
        match self {
            Self::MySQL => format!("`{ident}`"),
            Self::PostgreSQL | Self::SQLite => format!("\"{ident}\""),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Immutable description of the connected database.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionProfile {
    pub dialect: Dialect,
    /// Schema used when a tool call does not name one.
    pub default_schema: Option<String>,
    /// Whether the backend has named schemas inside one database.
    pub supports_schemas: bool,
    /// Whether the backend has catalogs (databases) above schemas.
    pub supports_catalogs: bool,
}

impl ConnectionProfile {
    /// Build the profile for a dialect.
    ///
    /// `configured_schema` wins; otherwise PostgreSQL falls back to `public`,
    /// MySQL to the database named in the URL and SQLite to `main`.
    pub fn new(dialect: Dialect, configured_schema: Option<String>, database: Option<String>) -> Self {
        let default_schema = match dialect {
            Dialect::PostgreSQL => configured_schema.or_else(|| Some("public".to_string())),
            Dialect::MySQL => configured_schema.or(database),
            Dialect::SQLite => configured_schema.or_else(|| Some("main".to_string())),
        };
        Self {
            dialect,
            default_schema,
            supports_schemas: !matches!(dialect, Dialect::SQLite),
            supports_catalogs: matches!(dialect, Dialect::PostgreSQL),
        }
    }
}

const MASK: &str = "****";

/// Query parameters that carry secrets in driver URLs.
const SECRET_PARAMS: &[&str] = &["password", "pass", "pwd", "sslpassword"];

/// Display-safe version of a connection string.
///
/// Masks the userinfo password and any password-like query parameter.
pub fn masked_connection_string(connection_string: &str) -> String {
    let Ok(mut url) = Url::parse(connection_string) else {
        return mask_userinfo(connection_string);
    };

    if url.password().is_some() {
        let _ = url.set_password(Some(MASK));
    }

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let is_secret = |key: &str| SECRET_PARAMS.contains(&key.to_ascii_lowercase().as_str());
    if pairs.iter().any(|(key, _)| is_secret(key)) {
        let masked = pairs.into_iter().map(|(key, value)| {
            let value = if is_secret(&key) { MASK.to_string() } else { value };
            (key, value)
        });
        url.query_pairs_mut().clear().extend_pairs(masked);
    }
    url.to_string()
}

/// Text-only masking of `user:pass@` for strings the URL parser rejects.
fn mask_userinfo(connection_string: &str) -> String {
    let scheme_end = connection_string.find("://").map_or(0, |p| p + 3);
    let Some(at_pos) = connection_string.rfind('@') else {
        return connection_string.to_string();
    };
    match connection_string[scheme_end..at_pos].find(':') {
        Some(offset) => format!(
            "{}{MASK}{}",
            &connection_string[..scheme_end + offset + 1],
            &connection_string[at_pos..]
        ),
        None => connection_string.to_string(),
    }
}

//! Identifier validation for structured tool parameters.
//!
//! Table, schema and column names cannot be bound as query parameters, so
//! any name that ends up inside generated SQL must first pass through
//! [`validate_identifier`] or [`validate_simple_identifier`]. The resulting
//! wrappers can only be rendered as quoted identifiers.
//!
//! Free-form SQL never goes through this module; it is classified instead.

use crate::error::{ToolError, ToolResult};
use crate::models::Dialect;

/// Longest accepted identifier part, in characters.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// A single identifier part that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleIdentifier(String);

impl SimpleIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render as a quoted identifier for the dialect.
    pub fn quoted(&self, dialect: Dialect) -> String {
        dialect.quote(&self.0)
    }
}

impl std::fmt::Display for SimpleIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A table name, optionally qualified with a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedIdentifier {
    schema: Option<SimpleIdentifier>,
    name: SimpleIdentifier,
}

impl ValidatedIdentifier {
    pub fn schema(&self) -> Option<&SimpleIdentifier> {
        self.schema.as_ref()
    }

    pub fn name(&self) -> &SimpleIdentifier {
        &self.name
    }

    /// Merge with a separately supplied schema parameter.
    ///
    /// Fails when the qualified form and the parameter disagree.
    pub fn with_schema(self, schema: Option<SimpleIdentifier>) -> ToolResult<Self> {
        match (&self.schema, schema) {
            (_, None) => Ok(self),
            (None, Some(schema)) => Ok(Self {
                schema: Some(schema),
                name: self.name,
            }),
            (Some(own), Some(other)) if *own == other => Ok(self),
            (Some(own), Some(other)) => Err(ToolError::invalid_identifier(
                format!("{}.{}", own, self.name),
                format!("table is qualified with schema '{own}' but schema '{other}' was given"),
            )),
        }
    }

    /// Render as `"schema"."table"` (or backticks for MySQL).
    pub fn quoted(&self, dialect: Dialect) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema.quoted(dialect), self.name.quoted(dialect)),
            None => self.name.quoted(dialect),
        }
    }
}

impl std::fmt::Display for ValidatedIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Validate a single identifier part (no dots).
pub fn validate_simple_identifier(candidate: &str) -> ToolResult<SimpleIdentifier> {
    check_part(candidate, candidate)?;
    Ok(SimpleIdentifier(candidate.to_string()))
}

/// Validate a table identifier, accepting one optional `schema.` prefix.
pub fn validate_identifier(candidate: &str) -> ToolResult<ValidatedIdentifier> {
    match candidate.split_once('.') {
        None => {
            check_part(candidate, candidate)?;
            Ok(ValidatedIdentifier {
                schema: None,
                name: SimpleIdentifier(candidate.to_string()),
            })
        }
        Some((schema, name)) => {
            if name.contains('.') {
                return Err(ToolError::invalid_identifier(
                    candidate,
                    "at most one '.' separating schema and table is allowed",
                ));
            }
            check_part(schema, candidate)?;
            check_part(name, candidate)?;
            Ok(ValidatedIdentifier {
                schema: Some(SimpleIdentifier(schema.to_string())),
                name: SimpleIdentifier(name.to_string()),
            })
        }
    }
}

fn check_part(part: &str, original: &str) -> ToolResult<()> {
    let mut chars = part.chars();
    let Some(first) = chars.next() else {
        return Err(ToolError::invalid_identifier(original, "identifier is empty"));
    };
    if part.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(ToolError::invalid_identifier(
            original,
            format!("longer than {MAX_IDENTIFIER_LEN} characters"),
        ));
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(ToolError::invalid_identifier(
            original,
            format!("must start with a letter or underscore, found {first:?}"),
        ));
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(ToolError::invalid_identifier(
            original,
            format!("contains disallowed character {bad:?}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn rejected(candidate: &str) -> bool {
        matches!(
            validate_identifier(candidate),
            Err(ref e) if e.kind() == ErrorKind::InvalidIdentifier
        )
    }

    #[test]
    fn test_valid_identifiers() {
        for name in ["users", "_tmp", "Order_Items2", "a", "x1_y2"] {
            let id = validate_identifier(name).unwrap();
            assert_eq!(id.to_string(), name);
            assert!(id.schema().is_none());
        }
    }

    #[test]
    fn test_schema_qualified() {
        let id = validate_identifier("sales.orders").unwrap();
        assert_eq!(id.schema().unwrap().as_str(), "sales");
        assert_eq!(id.name().as_str(), "orders");
        assert_eq!(id.quoted(Dialect::PostgreSQL), "\"sales\".\"orders\"");
        assert_eq!(id.quoted(Dialect::MySQL), "`sales`.`orders`");
    }

    #[test]
    fn test_injection_attempts_rejected() {
        for bad in [
            "users; DROP TABLE users",
            "users--",
            "users/*x*/",
            "\"users\"",
            "`users`",
            "users'",
            "a b",
            "a\tb",
            "a\\b",
            "tab\n",
            "1users",
            "",
            ".users",
            "users.",
            "a.b.c",
            "ünïcode",
        ] {
            assert!(rejected(bad), "should reject {bad:?}");
        }
    }

    #[test]
    fn test_length_limit() {
        let ok = "a".repeat(MAX_IDENTIFIER_LEN);
        assert!(validate_identifier(&ok).is_ok());
        let too_long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(rejected(&too_long));
        // each side of a qualified name is checked on its own
        assert!(validate_identifier(&format!("{ok}.{ok}")).is_ok());
    }

    #[test]
    fn test_simple_identifier_rejects_dot() {
        assert!(validate_simple_identifier("public").is_ok());
        assert!(validate_simple_identifier("public.users").is_err());
    }

    #[test]
    fn test_with_schema_merge() {
        let public = validate_simple_identifier("public").unwrap();
        let other = validate_simple_identifier("other").unwrap();

        let id = validate_identifier("users")
            .unwrap()
            .with_schema(Some(public.clone()))
            .unwrap();
        assert_eq!(id.to_string(), "public.users");

        let same = validate_identifier("public.users")
            .unwrap()
            .with_schema(Some(public))
            .unwrap();
        assert_eq!(same.to_string(), "public.users");

        let err = validate_identifier("public.users")
            .unwrap()
            .with_schema(Some(other))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIdentifier);
    }

    #[test]
    fn test_quoted_sqlite() {
        let id = validate_identifier("users").unwrap();
        assert_eq!(id.quoted(Dialect::SQLite), "\"users\"");
    }
}

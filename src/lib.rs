//! SQL Gateway MCP Server Library
//!
//! This library exposes a SQL database (SQLite, PostgreSQL, MySQL) to AI
//! assistants through MCP tools. Every statement passes identifier
//! validation or intent classification and an execution policy (read-only
//! mode, row cap, per-statement timeout) before it reaches the database.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{ErrorKind, ToolError, ToolResult};
pub use mcp::DbService;
pub use tools::ToolContext;

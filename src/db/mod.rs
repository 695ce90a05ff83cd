//! Database access layer.
//!
//! - [`pool`]: the single connection pool and per-session settings
//! - [`enforcer`]: execution policy, timeouts and row caps for every statement
//! - [`catalog`]: schema introspection, one backend per dialect
//! - [`types`]: row decoding into JSON

pub mod catalog;
pub mod enforcer;
#[macro_use]
pub mod macros;
pub mod pool;
pub mod types;

pub use catalog::{CatalogBackend, CatalogIntrospector};
pub use enforcer::{PolicyEnforcer, RunMode};
pub use pool::{Database, DbConnection, DbPool, SessionSettings};

//! Dialect dispatch macros.
//!
//! Each arm of the generated `match` is compiled separately, so a generic body
//! is monomorphized once per driver without any trait objects.

/// Dispatch over the variants of `DbPool`.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(database.pool(), {
///     MySql(p) => mysql::MysqlCatalog(p).list_schemas().await,
///     Postgres(p) => postgres::PostgresCatalog(p).list_schemas().await,
///     SQLite(p) => sqlite::SqliteCatalog(p).list_schemas().await,
/// })
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;

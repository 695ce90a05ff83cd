//! Shared SQLite fixtures for the integration tests.

#![allow(dead_code)]

use sql_gateway_mcp::config::DatabaseConfig;
use sql_gateway_mcp::db::{Database, DbPool, SessionSettings};
use sql_gateway_mcp::models::ExecutionPolicy;
use sql_gateway_mcp::tools::{DataToolHandler, QueryToolHandler, SchemaToolHandler, ToolContext};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const SHOP_SCHEMA: &str = r#"
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        status TEXT DEFAULT 'active'
    );
    CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT NOT NULL, price REAL);
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        product_id INTEGER REFERENCES products(id),
        quantity INTEGER DEFAULT 1
    );
    CREATE INDEX idx_orders_user ON orders(user_id);
    CREATE VIEW active_users AS SELECT * FROM users WHERE status = 'active';

    INSERT INTO users (email, status) VALUES
        ('a@example.com', 'active'),
        ('b@example.com', 'active'),
        ('c@example.com', 'banned'),
        ('d@example.com', NULL),
        ('e@example.com', 'active');
    INSERT INTO products (name, price) VALUES ('pen', 1.5), ('book', 12.0);
    INSERT INTO orders (user_id, product_id, quantity) VALUES (1, 1, 2), (1, 2, 1), (3, 1, 5);
"#;

/// A gateway over a throwaway SQLite file.
pub struct Gateway {
    pub dir: TempDir,
    pub context: ToolContext,
}

impl Gateway {
    /// Create the file with `setup_sql`, then reopen it under `policy`.
    pub async fn new(setup_sql: &str, policy: ExecutionPolicy) -> Self {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("gateway.db").display());
        let config = DatabaseConfig::parse(&url).unwrap();

        let writable = ExecutionPolicy {
            read_only: false,
            ..policy
        };
        let setup = Database::connect(&config, &writable, &settings()).await.unwrap();
        if let DbPool::SQLite(pool) = setup.pool() {
            sqlx::raw_sql(setup_sql).execute(pool).await.unwrap();
        }
        setup.close().await;

        let database = Database::connect(&config, &policy, &settings()).await.unwrap();
        Self {
            dir,
            context: ToolContext::new(Arc::new(database), policy),
        }
    }

    pub async fn shop(policy: ExecutionPolicy) -> Self {
        Self::new(SHOP_SCHEMA, policy).await
    }

    pub fn schema(&self) -> SchemaToolHandler {
        SchemaToolHandler::new(self.context.clone())
    }

    pub fn data(&self) -> DataToolHandler {
        DataToolHandler::new(self.context.clone())
    }

    pub fn query(&self) -> QueryToolHandler {
        QueryToolHandler::new(self.context.clone())
    }

    /// Count rows straight through the pool, bypassing the gateway.
    pub async fn count(&self, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let DbPool::SQLite(pool) = self.context.database.pool() else {
            unreachable!("fixtures are SQLite")
        };
        sqlx::query_scalar(&sql).fetch_one(pool).await.unwrap()
    }
}

pub fn read_only() -> ExecutionPolicy {
    ExecutionPolicy::default()
}

pub fn writable() -> ExecutionPolicy {
    ExecutionPolicy {
        read_only: false,
        ..Default::default()
    }
}

fn settings() -> SessionSettings {
    SessionSettings {
        application_name: "integration-test".into(),
        schema: None,
        connect_timeout: Duration::from_secs(5),
    }
}

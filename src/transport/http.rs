//! HTTP transport with Streamable HTTP support for the MCP server.
//!
//! This transport uses HTTP with SSE streaming responses,
//! which is suitable for web-based MCP integrations.

use super::{Transport, TransportError, wait_for_signal};
use crate::mcp::DbService;
use crate::tools::ToolContext;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// How long open SSE streams may delay shutdown.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport implementation with Streamable HTTP support.
///
/// Stateful by default: each client gets a session held by
/// `LocalSessionManager`. In stateless mode every request is served by a
/// fresh `DbService` and no session id is issued.
pub struct HttpTransport {
    context: ToolContext,
    server_name: String,
    host: String,
    port: u16,
    /// MCP endpoint path
    endpoint: String,
    stateless: bool,
}

impl HttpTransport {
    pub fn new(
        context: ToolContext,
        server_name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            context,
            server_name: server_name.into(),
            host: host.into(),
            port,
            endpoint: endpoint.into(),
            stateless: false,
        }
    }

    pub fn stateless(mut self, stateless: bool) -> Self {
        self.stateless = stateless;
        self
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the MCP endpoint path.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn router(&self) -> axum::Router {
        let context = self.context.clone();
        let server_name = self.server_name.clone();

        let service = StreamableHttpService::new(
            move || Ok(DbService::new(context.clone(), server_name.clone())),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig {
                stateful_mode: !self.stateless,
                ..Default::default()
            },
        );

        // nest_service rejects "/", so the root endpoint uses fallback_service
        if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> Result<(), TransportError> {
        let bind_addr = self.bind_addr();
        info!(stateless = self.stateless, "Starting MCP server with HTTP transport on {}", bind_addr);

        let app = self.router();

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        let outcome = tokio::select! {
            result = server => {
                match result {
                    Ok(()) => {
                        info!("HTTP server stopped");
                        Ok(())
                    }
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        Err(TransportError::Serve {
                            transport: self.name(),
                            message: e.to_string(),
                        })
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => Ok(())
        };

        info!("Closing database connections");
        self.context.database.close().await;

        outcome
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::{Database, SessionSettings};
    use crate::models::ExecutionPolicy;
    use tempfile::TempDir;

    async fn context() -> (TempDir, ToolContext) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("http.db").display());
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
        (dir, ToolContext::new(Arc::new(db), policy))
    }

    #[tokio::test]
    async fn test_http_transport_creation() {
        let (_dir, ctx) = context().await;
        let transport = HttpTransport::new(ctx, "gw", "127.0.0.1", 8080, "/mcp");
        assert_eq!(transport.name(), "http");
        assert_eq!(transport.bind_addr(), "127.0.0.1:8080");
        assert_eq!(transport.endpoint(), "/mcp");
        assert!(!transport.stateless);
    }

    #[tokio::test]
    async fn test_http_transport_stateless_root_endpoint() {
        let (_dir, ctx) = context().await;
        let transport = HttpTransport::new(ctx, "gw", "0.0.0.0", 3000, "/").stateless(true);
        assert!(transport.stateless);
        assert_eq!(transport.bind_addr(), "0.0.0.0:3000");
        let _router = transport.router();
    }
}

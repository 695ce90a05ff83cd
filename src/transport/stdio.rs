//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.
//! Logs must go to stderr while it runs.

use super::{Transport, TransportError, wait_for_signal};
use crate::mcp::DbService;
use crate::tools::ToolContext;
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout, following the MCP protocol specification.
pub struct StdioTransport {
    context: ToolContext,
    server_name: String,
}

impl StdioTransport {
    pub fn new(context: ToolContext, server_name: impl Into<String>) -> Self {
        Self {
            context,
            server_name: server_name.into(),
        }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> Result<(), TransportError> {
        info!("Starting MCP server with stdio transport");

        let service = DbService::new(self.context.clone(), self.server_name.clone());

        let running_service =
            service
                .serve(stdio())
                .await
                .map_err(|e| TransportError::Serve {
                    transport: self.name(),
                    message: e.to_string(),
                })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => info!("Stdio transport completed normally"),
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.context.database.close().await;
                        return Err(TransportError::Serve {
                            transport: self.name(),
                            message: e.to_string(),
                        });
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database connections");
        self.context.database.close().await;

        if shutdown_requested {
            // stdin reads block and cannot be interrupted by select!
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

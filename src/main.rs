//! SQL Gateway MCP Server - Main entry point.
//!
//! Connects to one database and serves the gateway tools over stdio or
//! Streamable HTTP.

use clap::Parser;
use sql_gateway_mcp::config::{Config, TransportMode};
use sql_gateway_mcp::db::{Database, SessionSettings};
use sql_gateway_mcp::error::{ErrorKind, ToolError};
use sql_gateway_mcp::models::masked_connection_string;
use sql_gateway_mcp::tools::ToolContext;
use sql_gateway_mcp::transport::{HttpTransport, StdioTransport, Transport};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Everything goes to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn report_startup_error(err: &ToolError) -> ExitCode {
    error!(kind = %err.kind(), error = %err, "Startup failed");
    eprintln!("{}: {}", kind_label(err.kind()), err);
    eprintln!("  {}", err.suggestion());
    match err.kind() {
        ErrorKind::ConfigurationError => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ConfigurationError => "ConfigurationError",
        ErrorKind::ConnectionFailure => "ConnectionFailure",
        _ => "Error",
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_tracing(&config);

    let db_config = match config.database_config() {
        Ok(c) => c,
        Err(e) => return report_startup_error(&e),
    };
    let policy = config.execution_policy();

    info!(
        transport = %config.transport,
        dialect = %db_config.dialect,
        url = %masked_connection_string(&db_config.connection_string),
        read_only = policy.read_only,
        max_result_rows = policy.max_result_rows,
        query_timeout_secs = policy.query_timeout_secs,
        "Starting SQL gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let settings = SessionSettings {
        application_name: config.name.clone(),
        schema: config.schema.clone(),
        connect_timeout: config.connect_timeout_duration(),
    };

    let database = match Database::connect(&db_config, &policy, &settings).await {
        Ok(db) => Arc::new(db),
        Err(e) => return report_startup_error(&e),
    };

    let context = ToolContext::new(database, policy);

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(context, &config.name).run().await
        }
        TransportMode::Http => {
            info!(
                addr = %config.http_bind_addr(),
                endpoint = %config.mcp_endpoint,
                stateless = config.stateless,
                "Using HTTP transport"
            );
            HttpTransport::new(
                context,
                &config.name,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .stateless(config.stateless)
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

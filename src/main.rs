use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use flomo_notes::cli::ServerArgs;
use flomo_notes::mcp::{JsonRpcHandler, McpServer};
use flomo_notes::tools::WriteNoteTool;
use flomo_notes::transport::StdioTransport;
use flomo_notes::{bootstrap, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();

    // Initialize logging (stderr; stdout carries protocol frames)
    logging::init(log::LevelFilter::Info);
    log::info!("Starting flomo MCP server...");

    let (config, client) = bootstrap::init_client(args.config.as_deref())?;

    let tool = WriteNoteTool::new(Arc::new(client), config.view_url.clone());
    let handler = Arc::new(JsonRpcHandler::new(McpServer::new(tool)));
    log::info!("Registered write_note tool");

    let transport = StdioTransport::new(Arc::clone(&handler));
    log::info!("MCP server ready, listening on stdio");

    tokio::select! {
        result = transport.run() => result.context("Transport error")?,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, cancelling in-flight requests");
            handler.shutdown();
        }
    }

    log::info!("Server stopped");
    Ok(())
}

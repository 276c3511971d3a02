use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, InitializeResult, ListToolsResult,
    ProtocolVersion, ServerCapabilities,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::McpError;
use crate::tools::write_note::TOOL_NAME;
use crate::tools::WriteNoteTool;

pub const SERVER_NAME: &str = "mcp-server-flomo";
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];
const LOG_TARGET: &str = "flomo::server";

/// MCP server exposing the `write_note` tool.
pub struct McpServer {
    write_note: WriteNoteTool,
}

impl McpServer {
    pub fn new(write_note: WriteNoteTool) -> Self {
        Self { write_note }
    }

    pub fn handle_initialize(&self, params: &Value) -> InitializeResult {
        let client = params
            .pointer("/clientInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        log::info!(target: LOG_TARGET, "MCP server initializing for client {}", client);

        InitializeResult {
            protocol_version: negotiate_protocol_version(params),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some("Use the write_note tool to save a markdown note to flomo.".to_string()),
        }
    }

    pub fn handle_list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: vec![self.write_note.definition()],
            next_cursor: None,
        }
    }

    pub async fn handle_call_tool(
        &self,
        request: CallToolRequestParam,
        cancel: CancellationToken,
    ) -> Result<CallToolResult, McpError> {
        if request.name != TOOL_NAME {
            return Err(McpError::ToolNotFound(request.name.to_string()));
        }
        Ok(self.write_note.call(request.arguments, cancel).await?)
    }
}

/// Echo the client's protocol version when supported, else offer the latest.
fn negotiate_protocol_version(params: &Value) -> ProtocolVersion {
    params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
        .and_then(|v| serde_json::from_value(Value::String(v.to_string())).ok())
        .unwrap_or(ProtocolVersion::LATEST)
}

/// JSON-RPC message handler for the MCP server.
///
/// Tracks a cancellation token per in-flight request so that
/// `notifications/cancelled` and shutdown reach the pending HTTP call.
pub struct JsonRpcHandler {
    server: McpServer,
    in_flight: Mutex<HashMap<String, CancellationToken>>,
    shutdown: CancellationToken,
}

impl JsonRpcHandler {
    pub fn new(server: McpServer) -> Self {
        Self {
            server,
            in_flight: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel every in-flight request.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_notification(message: &Value) -> bool {
        message.get("id").is_none()
    }

    /// Register a request before it is dispatched, returning its cancellation token.
    pub async fn register(&self, message: &Value) -> CancellationToken {
        let token = self.shutdown.child_token();
        if let Some(id) = message.get("id") {
            self.in_flight
                .lock()
                .await
                .insert(id.to_string(), token.clone());
        }
        token
    }

    /// Handle a message without an `id`. Never produces a response.
    pub async fn handle_notification(&self, message: &Value) {
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        match method {
            "notifications/cancelled" => {
                let Some(request_id) = message.pointer("/params/requestId") else {
                    log::warn!(target: LOG_TARGET, "Cancellation without requestId ignored");
                    return;
                };
                let key = request_id.to_string();
                match self.in_flight.lock().await.remove(&key) {
                    Some(token) => {
                        log::info!(target: LOG_TARGET, "Cancelling request {}", key);
                        token.cancel();
                    }
                    None => log::debug!(target: LOG_TARGET, "No in-flight request {}", key),
                }
            }
            "notifications/initialized" => {
                log::info!(target: LOG_TARGET, "Client initialized");
            }
            other => log::debug!(target: LOG_TARGET, "Ignoring notification {:?}", other),
        }
    }

    /// Process a JSON-RPC request and return its response.
    ///
    /// Returns `None` when the request was cancelled or the message is not a request.
    pub async fn handle_request(&self, request: Value, cancel: CancellationToken) -> Option<Value> {
        log::debug!(target: LOG_TARGET, "Handling JSON-RPC request: {:?}", request);

        let id = request.get("id").cloned()?;
        let Some(method) = request.get("method").and_then(Value::as_str) else {
            // A response sent by the client; nothing to answer.
            self.in_flight.lock().await.remove(&id.to_string());
            return None;
        };
        let params = request.get("params").cloned().unwrap_or(json!({}));

        let result = self.dispatch(method, params, cancel.clone()).await;
        self.in_flight.lock().await.remove(&id.to_string());

        if cancel.is_cancelled() {
            log::info!(target: LOG_TARGET, "Dropping response to cancelled request {}", id);
            return None;
        }

        Some(match result {
            Ok(result) => json!({
                "jsonrpc": "2.0",
                "result": result,
                "id": id,
            }),
            Err(error) => {
                log::warn!(target: LOG_TARGET, "Request {} failed: {}", id, error);
                json!({
                    "jsonrpc": "2.0",
                    "error": error.to_jsonrpc_error(),
                    "id": id,
                })
            }
        })
    }

    async fn dispatch(
        &self,
        method: &str,
        params: Value,
        cancel: CancellationToken,
    ) -> Result<Value, McpError> {
        match method {
            "initialize" => Ok(serde_json::to_value(self.server.handle_initialize(&params))?),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(serde_json::to_value(self.server.handle_list_tools())?),
            "tools/call" => {
                let request = serde_json::from_value::<CallToolRequestParam>(params)
                    .map_err(|e| McpError::InvalidParams(e.to_string()))?;
                let result = self.server.handle_call_tool(request, cancel).await?;
                Ok(serde_json::to_value(result)?)
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }
}

/// Error response for a line that is not valid JSON.
pub fn parse_error_response(err: &serde_json::Error) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": McpError::Parse(err.to_string()).to_jsonrpc_error(),
        "id": null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_config;
    use crate::client::NoteClient;
    use std::sync::Arc;

    fn handler() -> JsonRpcHandler {
        let client = NoteClient::new(&test_config("http://127.0.0.1:1")).unwrap();
        let tool = WriteNoteTool::new(Arc::new(client), "https://v.flomoapp.com");
        JsonRpcHandler::new(McpServer::new(tool))
    }

    async fn roundtrip(handler: &JsonRpcHandler, request: Value) -> Value {
        let token = handler.register(&request).await;
        handler.handle_request(request, token).await.unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let handler = handler();
        let response = roundtrip(
            &handler,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"clientInfo": {"name": "test", "version": "1"}}}),
        )
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_initialize_echoes_known_protocol_version() {
        let handler = handler();
        let response = roundtrip(
            &handler,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2024-11-05"}}),
        )
        .await;
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");

        let response = roundtrip(
            &handler,
            json!({"jsonrpc": "2.0", "id": 2, "method": "initialize",
                   "params": {"protocolVersion": "1999-01-01"}}),
        )
        .await;
        assert_eq!(
            response["result"]["protocolVersion"],
            serde_json::to_value(ProtocolVersion::LATEST).unwrap()
        );
    }

    #[tokio::test]
    async fn test_list_tools() {
        let handler = handler();
        let response = roundtrip(
            &handler,
            json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}),
        )
        .await;

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "write_note");
        assert_eq!(tools[0]["inputSchema"]["required"][0], "content");
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let handler = handler();
        let response = roundtrip(
            &handler,
            json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32601);

        let response = roundtrip(
            &handler,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "read_note", "arguments": {}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_missing_argument_is_invalid_params() {
        let handler = handler();
        let response = roundtrip(
            &handler,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "write_note", "arguments": {}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("content"));
    }

    #[tokio::test]
    async fn test_cancel_unregisters_request() {
        let handler = handler();
        let request = json!({"jsonrpc": "2.0", "id": 7, "method": "ping"});
        let token = handler.register(&request).await;

        handler
            .handle_notification(&json!({"jsonrpc": "2.0", "method": "notifications/cancelled",
                                          "params": {"requestId": 7}}))
            .await;

        assert!(token.is_cancelled());
        assert!(handler.handle_request(request, token).await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_children() {
        let handler = handler();
        let token = handler
            .register(&json!({"jsonrpc": "2.0", "id": 8, "method": "ping"}))
            .await;
        handler.shutdown();
        assert!(token.is_cancelled());
    }
}

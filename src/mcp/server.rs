//! MCP Server Implementation
//!
//! Handles JSON-RPC 2.0 messages over stdio for the repositories tool.

use super::tool::RepositoriesTool;
use super::types::*;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

const PROTOCOL_VERSION: &str = "2025-06-18";

/// MCP server exposing the repositories tool.
pub struct McpServer {
    tool: Option<RepositoriesTool>,
}

impl McpServer {
    /// Create a server; without a tool it answers with an empty tool list.
    pub fn new(tool: Option<RepositoriesTool>) -> Self {
        Self { tool }
    }

    /// Handle a JSON-RPC message, `None` for notifications.
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!("Notification received: {}", request.method);
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "ping" => JsonRpcResponse::success(request.id.clone(), serde_json::json!({})),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request),
            _ => JsonRpcResponse::error(
                request.id.clone(),
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let protocol_version = request
            .params
            .get("protocolVersion")
            .and_then(|v| v.as_str())
            .unwrap_or(PROTOCOL_VERSION);

        JsonRpcResponse::success(
            request.id.clone(),
            serde_json::json!({
                "protocolVersion": protocol_version,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": "depfinder",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<ToolDefinition> = self.tool.iter().map(RepositoriesTool::definition).collect();
        JsonRpcResponse::success(request.id.clone(), serde_json::json!({ "tools": tools }))
    }

    fn handle_tools_call(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let name = request.params.get("name").and_then(|v| v.as_str());

        let result = match (name, &self.tool) {
            (Some(name), Some(tool)) if name == tool.name() => tool.call(),
            (Some(other), _) => ToolCallResult::error(format!("Unknown tool: {}", other)),
            (None, _) => {
                return JsonRpcResponse::error(request.id.clone(), INVALID_PARAMS, "Missing tool name")
            }
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(request.id.clone(), value),
            Err(e) => JsonRpcResponse::error(request.id.clone(), INVALID_PARAMS, e.to_string()),
        }
    }

    /// Serve newline delimited JSON-RPC on stdin/stdout until stdin closes.
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline delimited JSON-RPC on any reader/writer pair.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: tokio::io::AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => self.handle_request(&request),
                Err(e) => {
                    warn!("Invalid JSON-RPC message: {}", e);
                    Some(JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e)))
                }
            };

            if let Some(response) = response {
                let mut json = serde_json::to_string(&response)?;
                json.push('\n');
                writer.write_all(json.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }
}

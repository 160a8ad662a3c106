//! Control-protocol dispatcher.
//!
//! Consumes the transport's inbound sequence, decodes each payload as a
//! JSON-RPC request, and answers it through the same transport. Implements
//! `initialize`, `ping`, `tools/list` and `tools/call`. Failures of any kind
//! are encoded as JSON-RPC errors or error tool results, never as HTTP errors.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ServerInfoConfig;
use crate::mcp::protocol::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::mcp::tools::ToolRegistry;
use crate::mcp::transport::{InboundMessage, Transport, TransportError};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Errors that stop the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("inbound message sequence already taken")]
    ReceiverTaken,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Dispatcher for control-protocol requests.
#[derive(Debug, Clone)]
pub struct McpServer {
    info: ServerInfoConfig,
    tools: ToolRegistry,
}

impl McpServer {
    pub fn new(info: ServerInfoConfig, tools: ToolRegistry) -> Self {
        Self { info, tools }
    }

    /// Serve until the transport's inbound sequence ends.
    pub async fn run<T: Transport>(&self, transport: &T) -> Result<(), ServerError> {
        transport.connect().await?;
        let mut inbound = transport.receive().await.ok_or(ServerError::ReceiverTaken)?;

        tracing::info!(name = %self.info.name, version = %self.info.version, "MCP server running");

        while let Some(InboundMessage {
            connection_id,
            payload,
        }) = inbound.recv().await
        {
            let reply = self.handle_payload(&payload);
            // Notifications still get an empty body so the HTTP exchange completes.
            let bytes = reply.unwrap_or_default();
            if let Err(e) = transport.reply(connection_id, bytes).await {
                tracing::warn!(connection_id = %connection_id, error = %e, "MCP reply not delivered");
            }
        }

        tracing::info!("MCP inbound sequence ended");
        Ok(())
    }

    /// Decode one payload and produce the serialized reply, or `None` for notifications.
    pub fn handle_payload(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let response = match serde_json::from_slice::<JsonRpcRequest>(payload) {
            Ok(request) => self.handle_request(&request)?,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid MCP payload");
                JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Invalid JSON: {}", e))
            }
        };

        match serde_json::to_vec(&response) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode MCP response");
                let fallback = json!({
                    "jsonrpc": JSONRPC_VERSION,
                    "id": Value::Null,
                    "error": { "code": INTERNAL_ERROR, "message": "Failed to encode response" },
                });
                Some(fallback.to_string().into_bytes())
            }
        }
    }

    /// Answer a decoded request. Notifications yield `None`.
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = match &request.id {
            Some(id) => id.clone(),
            None => {
                tracing::debug!(method = %request.method, "MCP notification");
                return None;
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid JSON-RPC version"));
        }

        tracing::debug!(method = %request.method, id = %id, "MCP request");
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.tools.list()),
            "tools/call" => self.call_tool(id, &request.params),
            other => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": self.info.name, "version": self.info.version },
        })
    }

    fn call_tool(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let params: CallToolParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid tools/call params: {}", e))
            }
        };

        let result = self.tools.call(&params.name, &params.arguments);
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }
}

impl Default for McpServer {
    fn default() -> Self {
        Self::new(ServerInfoConfig::default(), ToolRegistry::default())
    }
}

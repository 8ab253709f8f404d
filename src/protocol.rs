//! JSON-RPC 2.0 wire types and MCP request builders.
//!
//! The probe speaks plain JSON-RPC 2.0 to the MCP server, one object per
//! line on stdin/stdout. This module holds the (de)serialization types for
//! that boundary plus helpers for the two methods the probe exercises:
//! `initialize` and `tools/call`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// MCP protocol revision the probe announces during the handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
///
/// The `id` is optional so that notifications and other id-less objects on
/// the shared stdout channel deserialize cleanly and can be ignored instead
/// of failing the parse.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC error payload.
///
/// MCP servers are not consistent about including `code`, so only `message`
/// is required here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Build the `initialize` params announcing protocol version and client
/// identity.
pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

/// Build `tools/call` params for a named tool and its arguments.
pub fn tool_call_params(tool: &str, arguments: Value) -> Value {
    json!({
        "name": tool,
        "arguments": arguments,
    })
}

/// Extract the textual payload of an MCP tool result.
///
/// Tool results carry their text as `result.content[0].text`. Missing or
/// differently-shaped results yield an empty string rather than an error;
/// the caller decides whether an empty payload matters.
pub fn content_text(result: &Value) -> &str {
    result
        .get("content")
        .and_then(|c| c.get(0))
        .and_then(|item| item.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or("")
}

//! RPC client for communication with the MCP server subprocess.
//!
//! This module is the probe's protocol boundary: it owns the server
//! subprocess and pairs each outgoing request with its eventual response
//! (or timeout) across the server's line-oriented stdout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐        stdin/stdout          ┌─────────────────────┐
//! │   mcp-probe     │  ◄──────────────────────────►│     MCP server      │
//! │   (RpcClient)   │   JSON-RPC 2.0, one object   │    (subprocess)     │
//! └─────────────────┘        per line              └─────────────────────┘
//! ```
//!
//! # Protocol
//!
//! Newline-delimited JSON-RPC 2.0 in both directions:
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"initialize","params":{...}}
//! ```
//!
//! Responses are correlated by `id`, not arrival order; the correlation map
//! supports concurrent outstanding requests even though the probe's fixed
//! script issues them one at a time.
//!
//! # Usage
//!
//! ```ignore
//! use mcp_probe::config::ProbeConfig;
//! use mcp_probe::rpc::RpcClient;
//! use serde_json::json;
//!
//! let client = RpcClient::spawn(&ProbeConfig::from_env())?;
//! let result = client.call("tools/call", json!({"name": "get_dom"})).await?;
//! ```

mod client;
mod framing;

pub use client::{RpcClient, RpcError};
pub use framing::LineBuffer;

//! MCP Probe Library
//!
//! This library provides the core components of the mcp-probe visual-test
//! harness:
//!
//! - `rpc` - RPC client owning the MCP server subprocess and the
//!   pending-request correlation map
//! - `protocol` - JSON-RPC 2.0 wire types and MCP request builders
//! - `harness` - the fixed five-step test sequence
//! - `artifacts` - DOM snapshot and screenshot persistence
//! - `config` - probe configuration with environment overrides
//!
//! # RPC Module
//!
//! The `rpc` module is the protocol boundary to the server under test:
//!
//! ```ignore
//! use mcp_probe::config::ProbeConfig;
//! use mcp_probe::rpc::RpcClient;
//!
//! let config = ProbeConfig::from_env();
//! let client = RpcClient::spawn(&config)?;
//! let result = client.call("initialize", serde_json::json!({})).await?;
//! ```

pub mod artifacts;
pub mod config;
pub mod harness;
pub mod protocol;
pub mod rpc;

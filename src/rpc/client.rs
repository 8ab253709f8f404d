//! RPC client for JSON-RPC 2.0 communication with an MCP server subprocess.
//!
//! This module provides `RpcClient`, an async client that spawns the MCP
//! server, writes newline-delimited JSON-RPC requests to its stdin, and
//! routes responses read from its stdout back to the originating call via a
//! pending-request correlation map, with automatic timeout handling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::config::ProbeConfig;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::rpc::framing::LineBuffer;

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Pending-request table: request id to the channel that settles its caller.
type PendingMap = HashMap<u64, oneshot::Sender<Result<serde_json::Value, RpcError>>>;

/// RPC-specific error types.
///
/// These cover every way a probe run can fail at the protocol boundary:
/// the server cannot be launched, a request times out, the server answers
/// with an explicit error, or the channel itself breaks.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Failed to spawn the MCP server process.
    #[error("Failed to spawn MCP server: {0}")]
    Spawn(#[source] std::io::Error),

    /// Request timed out waiting for a response.
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Server returned a JSON-RPC error response.
    #[error("Server error: {message}")]
    ServerError {
        /// JSON-RPC error code, when the server supplies one
        code: Option<i64>,
        /// Error message
        message: String,
        /// Optional additional data
        data: Option<serde_json::Value>,
    },

    /// Protocol-level error (encoding, channel closed by server exit).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl From<JsonRpcError> for RpcError {
    fn from(err: JsonRpcError) -> Self {
        RpcError::ServerError {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

/// RPC client owning the MCP server subprocess.
///
/// The client spawns the server with piped stdin/stdout, runs a reader task
/// that demultiplexes response lines back to their callers, and kills the
/// subprocess when shut down or dropped.
///
/// # Correlation
///
/// Each `call` registers a oneshot channel under a fresh id before writing
/// the request line. The reader task settles the channel when a response
/// with a matching id arrives; responses are matched by id, not arrival
/// order, so out-of-order and concurrent responses route correctly. An
/// entry is removed exactly once, by whichever of response arrival or
/// timeout happens first, so settlement is at-most-once.
///
/// # Example
///
/// ```ignore
/// use mcp_probe::config::ProbeConfig;
/// use mcp_probe::rpc::RpcClient;
/// use serde_json::json;
///
/// let client = RpcClient::spawn(&ProbeConfig::from_env())?;
/// let result = client.call("initialize", json!({})).await?;
/// ```
pub struct RpcClient {
    /// Child process handle, killed on shutdown and on drop.
    child: Child,
    /// Writer for outgoing request lines. Behind an async mutex so `call`
    /// can take `&self` and callers may hold requests in flight concurrently.
    stdin: tokio::sync::Mutex<ChildStdin>,
    /// Correlation map shared with the reader task.
    pending: Arc<Mutex<PendingMap>>,
    /// Monotonically increasing request ID counter.
    request_id: AtomicU64,
    /// Per-request timeout duration.
    timeout: Duration,
    /// Reader task handle, aborted on shutdown.
    reader: JoinHandle<()>,
}

impl RpcClient {
    /// Spawn the MCP server and start the response reader task.
    ///
    /// The server inherits the probe's environment plus the one variable
    /// designating the IPC socket path it should bind. Its stderr is
    /// discarded: server logs are routed away from the protocol channel.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Spawn` if the server binary cannot be started, and
    /// `RpcError::Protocol` if its stdio pipes are unavailable.
    pub fn spawn(config: &ProbeConfig) -> Result<Self, RpcError> {
        debug!(
            program = %config.server_program,
            arg = %config.server_arg,
            "Spawning MCP server"
        );

        let mut child = Command::new(&config.server_program)
            .arg(&config.server_arg)
            .env(crate::config::IPC_PATH_ENV, &config.socket_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(RpcError::Spawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RpcError::Protocol("MCP server stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RpcError::Protocol("MCP server stdout unavailable".to_string()))?;

        let pending: Arc<Mutex<PendingMap>> = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(Self::reader_task(stdout, Arc::clone(&pending)));

        Ok(Self {
            child,
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            request_id: AtomicU64::new(1),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            reader,
        })
    }

    /// Set the per-request timeout duration.
    ///
    /// Default is 30 seconds.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Send a JSON-RPC 2.0 request and wait for the matching response.
    ///
    /// This method:
    /// 1. Registers a pending entry under an auto-incremented id
    /// 2. Writes the request as one JSON object followed by a newline
    /// 3. Waits for the reader task to settle the entry (with timeout)
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No response arrives within the window (`RpcError::Timeout`)
    /// - The server answers with an error payload (`RpcError::ServerError`)
    /// - The server exits before responding (`RpcError::Protocol`)
    /// - The request cannot be written (`RpcError::Io`)
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        let id = self.next_id();
        let request = JsonRpcRequest::new(method, params, id);

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending map lock poisoned")
            .insert(id, tx);

        if let Err(e) = self.write_request(&request).await {
            // The entry must not outlive a request that never went out
            self.remove_pending(id);
            return Err(e);
        }

        match timeout(self.timeout, rx).await {
            Ok(Ok(settled)) => settled,
            Ok(Err(_)) => Err(RpcError::Protocol(
                "MCP server exited before responding".to_string(),
            )),
            Err(_) => {
                // Unregister so a late response for this id is ignored
                self.remove_pending(id);
                Err(RpcError::Timeout(self.timeout.as_secs()))
            }
        }
    }

    /// Terminate the subprocess and stop the reader task.
    ///
    /// Called on both success and failure exit paths; also implied by drop
    /// via `kill_on_drop`, but an explicit shutdown reaps the child instead
    /// of leaving that to the runtime.
    pub async fn shutdown(&mut self) {
        self.reader.abort();
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill MCP server: {}", e);
        }
    }

    /// Generate the next request ID.
    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    fn remove_pending(&self, id: u64) {
        self.pending
            .lock()
            .expect("pending map lock poisoned")
            .remove(&id);
    }

    /// Serialize and write one request line to the server's stdin.
    async fn write_request(&self, request: &JsonRpcRequest) -> Result<(), RpcError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| RpcError::Protocol(format!("Failed to serialize request: {}", e)))?;
        line.push('\n');

        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await.map_err(RpcError::Io)?;
        stdin.flush().await.map_err(RpcError::Io)?;
        Ok(())
    }

    /// Reader task draining the server's stdout.
    ///
    /// Feeds every chunk through the line buffer and routes each complete
    /// line. Exits on EOF (server exited); outstanding senders drop with the
    /// map when the client itself is dropped, and callers still waiting on a
    /// dropped sender observe a closed channel rather than a full timeout.
    async fn reader_task(mut stdout: tokio::process::ChildStdout, pending: Arc<Mutex<PendingMap>>) {
        let mut buffer = LineBuffer::new();
        let mut chunk = [0u8; 4096];

        loop {
            match stdout.read(&mut chunk).await {
                Ok(0) => {
                    warn!("MCP server stdout closed (server exited)");
                    // Fail anything still waiting instead of letting it
                    // run out its full timeout
                    pending
                        .lock()
                        .expect("pending map lock poisoned")
                        .clear();
                    return;
                }
                Ok(n) => {
                    for line in buffer.push(&chunk[..n]) {
                        Self::route_line(&pending, &line);
                    }
                }
                Err(e) => {
                    warn!("Failed to read MCP server stdout: {}", e);
                    pending
                        .lock()
                        .expect("pending map lock poisoned")
                        .clear();
                    return;
                }
            }
        }
    }

    /// Route one complete output line to its pending caller, if any.
    ///
    /// Unparseable lines are protocol noise on a channel shared with
    /// non-protocol output in principle; they are dropped, not escalated.
    /// Objects with an absent, non-numeric, or unknown id are ignored,
    /// including responses whose caller already timed out.
    fn route_line(pending: &Mutex<PendingMap>, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let response: JsonRpcResponse = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(_) => {
                trace!("ignoring non-JSON line from server output");
                return;
            }
        };

        let Some(id) = response.id else {
            trace!("ignoring id-less object from server output");
            return;
        };

        let Some(tx) = pending
            .lock()
            .expect("pending map lock poisoned")
            .remove(&id)
        else {
            debug!("ignoring response for unknown or settled request {}", id);
            return;
        };

        let settled = match response.error {
            Some(err) => Err(err.into()),
            None => Ok(response.result.unwrap_or(serde_json::Value::Null)),
        };
        // A caller that timed out between removal and here is gone; the
        // failed send is fine either way
        let _ = tx.send(settled);
    }
}

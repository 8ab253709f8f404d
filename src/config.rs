//! Probe configuration.
//!
//! Everything the probe needs to launch and exercise an MCP server: the
//! server command, the IPC socket path handed to it, the artifact output
//! paths, and the timeout windows. Values come from fixed defaults with
//! environment-variable overrides; the probe itself takes no arguments.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable the spawned server reads for its IPC socket path.
pub const IPC_PATH_ENV: &str = "TAURI_MCP_IPC_PATH";

/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default whole-run timeout in seconds.
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 60;

/// Resolve the default socket path handed to the MCP server.
///
/// Resolution order:
/// 1. `$XDG_RUNTIME_DIR/tauri-mcp.sock` (Linux standard)
/// 2. `~/Library/Caches/tauri-mcp.sock` (macOS)
/// 3. `/tmp/tauri-mcp.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("tauri-mcp.sock");
    }

    if let Some(cache_dir) = dirs::cache_dir() {
        return cache_dir.join("tauri-mcp.sock");
    }

    PathBuf::from("/tmp/tauri-mcp.sock")
}

/// Configuration for one probe run.
///
/// # Environment overrides
///
/// | Variable                    | Field                |
/// |-----------------------------|----------------------|
/// | `MCP_PROBE_SERVER`          | `server_program`     |
/// | `MCP_PROBE_SERVER_ARG`      | `server_arg`         |
/// | `MCP_PROBE_SOCKET`          | `socket_path`        |
/// | `MCP_PROBE_WINDOW`          | `window_label`       |
/// | `MCP_PROBE_DOM_PATH`        | `dom_snapshot_path`  |
/// | `MCP_PROBE_SCREENSHOT_PATH` | `screenshot_path`    |
/// | `MCP_PROBE_REQUEST_TIMEOUT` | `request_timeout` (seconds) |
/// | `MCP_PROBE_RUN_TIMEOUT`     | `run_timeout` (seconds)     |
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Program that runs the MCP server.
    pub server_program: String,
    /// Single argument passed to the server program.
    pub server_arg: String,
    /// Socket path exported to the server via `TAURI_MCP_IPC_PATH`.
    pub socket_path: PathBuf,
    /// Label of the window the tool calls target.
    pub window_label: String,
    /// Where the DOM snapshot is written.
    pub dom_snapshot_path: PathBuf,
    /// Where the decoded screenshot is written.
    pub screenshot_path: PathBuf,
    /// Per-request timeout window.
    pub request_timeout: Duration,
    /// Bound on the whole run, independent of per-request timeouts.
    pub run_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            server_program: "node".to_string(),
            server_arg: "build/index.js".to_string(),
            socket_path: default_socket_path(),
            window_label: "main".to_string(),
            dom_snapshot_path: tmp.join("mcp-probe-dom.html"),
            screenshot_path: tmp.join("mcp-probe-screenshot.png"),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            run_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
        }
    }
}

impl ProbeConfig {
    /// Build a configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("MCP_PROBE_SERVER") {
            config.server_program = v;
        }
        if let Ok(v) = std::env::var("MCP_PROBE_SERVER_ARG") {
            config.server_arg = v;
        }
        if let Ok(v) = std::env::var("MCP_PROBE_SOCKET") {
            config.socket_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MCP_PROBE_WINDOW") {
            config.window_label = v;
        }
        if let Ok(v) = std::env::var("MCP_PROBE_DOM_PATH") {
            config.dom_snapshot_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MCP_PROBE_SCREENSHOT_PATH") {
            config.screenshot_path = PathBuf::from(v);
        }
        if let Some(secs) = env_secs("MCP_PROBE_REQUEST_TIMEOUT") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("MCP_PROBE_RUN_TIMEOUT") {
            config.run_timeout = Duration::from_secs(secs);
        }

        config
    }
}

/// Parse a seconds value from an environment variable, ignoring junk.
fn env_secs(var: &str) -> Option<u64> {
    match std::env::var(var) {
        Ok(value) => match value.parse() {
            Ok(secs) => Some(secs),
            Err(_) => {
                tracing::warn!("Ignoring non-numeric {}={}", var, value);
                None
            }
        },
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::default();

        assert_eq!(config.server_program, "node");
        assert_eq!(config.server_arg, "build/index.js");
        assert_eq!(config.window_label, "main");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.run_timeout, Duration::from_secs(60));
        assert!(config
            .dom_snapshot_path
            .file_name()
            .is_some_and(|n| n == "mcp-probe-dom.html"));
    }

    #[test]
    fn test_default_socket_path_format() {
        let path = default_socket_path();

        assert!(path.is_absolute() || path.starts_with("/tmp"));

        let filename = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(filename, "tauri-mcp.sock");
    }

    #[test]
    fn test_env_secs_rejects_junk() {
        // Unset variables and malformed values both fall back to None
        assert_eq!(env_secs("MCP_PROBE_NO_SUCH_VAR"), None);

        std::env::set_var("MCP_PROBE_TEST_SECS", "not-a-number");
        assert_eq!(env_secs("MCP_PROBE_TEST_SECS"), None);

        std::env::set_var("MCP_PROBE_TEST_SECS", "45");
        assert_eq!(env_secs("MCP_PROBE_TEST_SECS"), Some(45));

        std::env::remove_var("MCP_PROBE_TEST_SECS");
    }
}

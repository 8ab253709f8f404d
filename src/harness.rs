//! The fixed visual-test sequence run against the MCP server.
//!
//! Five steps, strictly sequential, each awaited before the next: the
//! `initialize` handshake, a DOM snapshot, a screenshot capture, a
//! window-geometry script, and a pair of page-inspection scripts. The first
//! failing step aborts the whole run.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::artifacts;
use crate::config::ProbeConfig;
use crate::protocol::{content_text, initialize_params, tool_call_params};
use crate::rpc::{RpcClient, RpcError};

/// Collects window geometry and document metadata inside the target window.
const WINDOW_INFO_JS: &str = r#"JSON.stringify({
  width: window.innerWidth,
  height: window.innerHeight,
  url: window.location.href,
  title: document.title
})"#;

/// Scans for elements that indicate a rendering or boundary error.
const ERROR_SCAN_JS: &str = r#"
const errors = [];
const errorElements = document.querySelectorAll('[data-error], .error, .error-boundary');
errorElements.forEach(el => {
  errors.push({
    type: 'error-element',
    text: el.textContent?.substring(0, 100),
    className: el.className
  });
});
JSON.stringify({ errors, errorCount: errors.length });
"#;

/// Enumerates interactive elements and samples up to ten button labels.
const INTERACTIVE_SCAN_JS: &str = r#"
const buttons = document.querySelectorAll('button');
const inputs = document.querySelectorAll('input, textarea');
const links = document.querySelectorAll('a[href]');
JSON.stringify({
  buttons: buttons.length,
  inputs: inputs.length,
  links: links.length,
  buttonTexts: Array.from(buttons).slice(0, 10).map(b => b.textContent?.trim()).filter(t => t)
});
"#;

/// How much of an unexpected screenshot payload to surface in the log.
const DIAGNOSTIC_PREFIX_CHARS: usize = 200;

/// What each step of a successful run observed.
#[derive(Debug)]
pub struct RunReport {
    /// Size of the DOM snapshot written to disk.
    pub dom_bytes: usize,
    /// Whether the screenshot decoded and was written.
    pub screenshot_saved: bool,
    /// Window geometry and document metadata.
    pub window_info: Value,
    /// Number of error-indicating elements found.
    pub error_count: u64,
    /// Interactive element counts and sampled button labels.
    pub interactive: Value,
}

/// Drives the fixed test sequence against one MCP server subprocess.
pub struct Harness {
    client: RpcClient,
    config: ProbeConfig,
}

impl Harness {
    pub fn new(client: RpcClient, config: ProbeConfig) -> Self {
        Self { client, config }
    }

    /// Run all five steps in order.
    ///
    /// Any step failure aborts the sequence; the caller is responsible for
    /// shutting the client down afterwards (both on success and failure).
    pub async fn run(&mut self) -> Result<RunReport> {
        self.initialize().await?;
        let dom_bytes = self.capture_dom().await?;
        let screenshot_saved = self.capture_screenshot().await?;
        let window_info = self.inspect_window().await?;
        let error_count = self.scan_for_errors().await?;
        let interactive = self.enumerate_interactive().await?;

        Ok(RunReport {
            dom_bytes,
            screenshot_saved,
            window_info,
            error_count,
            interactive,
        })
    }

    /// Terminate the server subprocess.
    pub async fn shutdown(&mut self) {
        self.client.shutdown().await;
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, RpcError> {
        self.client
            .call("tools/call", tool_call_params(tool, arguments))
            .await
    }

    /// Step 1: handshake. The result is discarded beyond error checking.
    async fn initialize(&self) -> Result<()> {
        info!("Initializing MCP connection");
        self.client
            .call("initialize", initialize_params())
            .await
            .context("initialize handshake failed")?;
        info!("MCP connection initialized");
        Ok(())
    }

    /// Step 2: retrieve the DOM and persist it.
    async fn capture_dom(&self) -> Result<usize> {
        let result = self
            .call_tool("get_dom", json!({"window_label": self.config.window_label}))
            .await
            .context("get_dom failed")?;

        let dom = content_text(&result);
        info!("DOM retrieved: {} characters", dom.len());

        artifacts::write_dom_snapshot(&self.config.dom_snapshot_path, dom)?;
        info!("DOM saved to {}", self.config.dom_snapshot_path.display());
        Ok(dom.len())
    }

    /// Step 3: capture a screenshot and persist the decoded image.
    ///
    /// A payload without a decodable base64 section is a diagnostic, not a
    /// failure; the run continues.
    async fn capture_screenshot(&self) -> Result<bool> {
        let result = self
            .call_tool(
                "take_screenshot",
                json!({"window_label": self.config.window_label}),
            )
            .await
            .context("take_screenshot failed")?;

        let payload = content_text(&result);
        info!("Screenshot captured: {} bytes", payload.len());

        match artifacts::decode_data_uri(payload) {
            Some(bytes) => {
                artifacts::write_screenshot(&self.config.screenshot_path, &bytes)?;
                info!(
                    "Screenshot saved to {}",
                    self.config.screenshot_path.display()
                );
                Ok(true)
            }
            None => {
                warn!(
                    "Unexpected screenshot payload format: {}",
                    payload_prefix(payload)
                );
                Ok(false)
            }
        }
    }

    /// Step 4: collect window geometry and document metadata.
    async fn inspect_window(&self) -> Result<Value> {
        let result = self
            .call_tool("execute_js", json!({"code": WINDOW_INFO_JS}))
            .await
            .context("window info script failed")?;

        let window_info = parse_script_result(&result).context("window info was not valid JSON")?;
        info!("Window info: {}", window_info);
        Ok(window_info)
    }

    /// Step 5a: count error-indicating elements.
    async fn scan_for_errors(&self) -> Result<u64> {
        let result = self
            .call_tool("execute_js", json!({"code": ERROR_SCAN_JS}))
            .await
            .context("error scan script failed")?;

        let scan = parse_script_result(&result).context("error scan was not valid JSON")?;
        let error_count = scan["errorCount"].as_u64().unwrap_or(0);
        if error_count > 0 {
            warn!("Found {} error elements: {}", error_count, scan);
        } else {
            info!("No visible errors found");
        }
        Ok(error_count)
    }

    /// Step 5b: enumerate interactive elements.
    async fn enumerate_interactive(&self) -> Result<Value> {
        let result = self
            .call_tool("execute_js", json!({"code": INTERACTIVE_SCAN_JS}))
            .await
            .context("interactive element scan failed")?;

        let interactive =
            parse_script_result(&result).context("interactive scan was not valid JSON")?;
        info!("Interactive elements: {}", interactive);
        Ok(interactive)
    }
}

/// Parse the textual result of an `execute_js` call as JSON.
///
/// An empty payload parses as an empty object, matching a script that
/// evaluated to nothing.
fn parse_script_result(result: &Value) -> Result<Value, serde_json::Error> {
    let text = content_text(result);
    if text.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(text)
}

/// Bounded, char-safe prefix of a payload for diagnostics.
fn payload_prefix(payload: &str) -> String {
    if payload.chars().count() <= DIAGNOSTIC_PREFIX_CHARS {
        return payload.to_string();
    }
    let prefix: String = payload.chars().take(DIAGNOSTIC_PREFIX_CHARS).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_script_result() {
        let result = json!({
            "content": [{"type": "text", "text": "{\"width\":800,\"height\":600}"}]
        });
        let parsed = parse_script_result(&result).unwrap();
        assert_eq!(parsed["width"], 800);
        assert_eq!(parsed["height"], 600);
    }

    #[test]
    fn test_parse_script_result_empty_payload() {
        let parsed = parse_script_result(&json!({"content": []})).unwrap();
        assert_eq!(parsed, json!({}));
    }

    #[test]
    fn test_parse_script_result_rejects_malformed() {
        let result = json!({
            "content": [{"type": "text", "text": "not json"}]
        });
        assert!(parse_script_result(&result).is_err());
    }

    #[test]
    fn test_payload_prefix_short_payload_unchanged() {
        assert_eq!(payload_prefix("short"), "short");
    }

    #[test]
    fn test_payload_prefix_truncates_long_payload() {
        let long = "x".repeat(500);
        let prefix = payload_prefix(&long);
        assert_eq!(prefix.chars().count(), DIAGNOSTIC_PREFIX_CHARS + 3);
        assert!(prefix.ends_with("..."));
    }

    #[test]
    fn test_payload_prefix_char_boundary_safe() {
        // Multi-byte characters must not be split
        let long = "é".repeat(300);
        let prefix = payload_prefix(&long);
        assert!(prefix.ends_with("..."));
        assert_eq!(prefix.chars().count(), DIAGNOSTIC_PREFIX_CHARS + 3);
    }
}

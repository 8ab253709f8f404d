//! Artifact persistence for probe runs.
//!
//! A run leaves two files behind for human inspection: the DOM snapshot and
//! the decoded screenshot. Screenshots arrive as `data:` URIs; the base64
//! payload after the marker is decoded to raw image bytes before writing.

use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Marker separating a data-URI header from its base64 payload.
const BASE64_MARKER: &str = "base64,";

/// Persist the DOM snapshot text.
pub fn write_dom_snapshot(path: &Path, html: &str) -> Result<()> {
    std::fs::write(path, html)
        .with_context(|| format!("Failed to write DOM snapshot to {}", path.display()))
}

/// Decode the base64 payload of a `data:` URI.
///
/// Returns `None` when the payload carries no `base64,` marker or the
/// trailing portion is not valid base64; the caller reports a diagnostic
/// and continues, since an unexpected screenshot format is not fatal to a
/// run.
pub fn decode_data_uri(payload: &str) -> Option<Vec<u8>> {
    let (_, encoded) = payload.split_once(BASE64_MARKER)?;
    STANDARD.decode(encoded).ok()
}

/// Persist decoded screenshot bytes.
pub fn write_screenshot(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write screenshot to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_data_uri_exact_bytes() {
        // "AAAA" is the base64 encoding of three zero bytes
        let decoded = decode_data_uri("data:image/png;base64,AAAA").unwrap();
        assert_eq!(decoded, vec![0u8, 0, 0]);
    }

    #[test]
    fn test_decode_data_uri_roundtrip() {
        let original = b"\x89PNG\r\n\x1a\n fake image bytes";
        let payload = format!("data:image/png;base64,{}", STANDARD.encode(original));
        assert_eq!(decode_data_uri(&payload).unwrap(), original.to_vec());
    }

    #[test]
    fn test_decode_without_marker() {
        assert_eq!(decode_data_uri("raw png bytes here"), None);
        assert_eq!(decode_data_uri(""), None);
    }

    #[test]
    fn test_decode_invalid_base64() {
        assert_eq!(decode_data_uri("data:image/png;base64,@@@not-base64@@@"), None);
    }

    #[test]
    fn test_write_artifacts_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        let dom_path = dir.path().join("dom.html");
        write_dom_snapshot(&dom_path, "<html><body>hi</body></html>").unwrap();
        assert_eq!(
            std::fs::read_to_string(&dom_path).unwrap(),
            "<html><body>hi</body></html>"
        );

        let shot_path = dir.path().join("shot.png");
        write_screenshot(&shot_path, &[1, 2, 3]).unwrap();
        assert_eq!(std::fs::read(&shot_path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let result = write_dom_snapshot(Path::new("/nonexistent-dir-xyz/dom.html"), "x");
        assert!(result.is_err());
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("Failed to write DOM snapshot"), "{}", msg);
    }
}

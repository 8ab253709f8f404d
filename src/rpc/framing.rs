//! Newline-delimited message framing for JSON-RPC over pipes.
//!
//! The MCP server writes one JSON object per line on its stdout. Pipe reads
//! deliver arbitrary chunks, so a line may arrive split across several reads
//! or several lines may arrive in one. `LineBuffer` reassembles chunk
//! boundaries: complete lines are drained out, the trailing partial line is
//! retained for the next chunk.

/// Accumulating buffer for not-yet-newline-terminated subprocess output.
///
/// Invariant: after `push` returns, the buffer holds at most one partial
/// line and no newline byte.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it produced.
    ///
    /// Lines are returned without their trailing newline. A line that is not
    /// valid UTF-8 is dropped here; the channel is shared with non-protocol
    /// output in principle, and such noise is tolerated rather than escalated.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the newline itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            match String::from_utf8(line) {
                Ok(s) => lines.push(s),
                Err(_) => tracing::trace!("dropping non-UTF-8 line from server output"),
            }
        }
        lines
    }

    /// Bytes currently held as a partial line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_complete_line() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"{\"id\":1}\n");
        assert_eq!(lines, vec!["{\"id\":1}".to_string()]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut buf = LineBuffer::new();

        assert!(buf.push(b"{\"id\":1,\"res").is_empty());
        assert_eq!(buf.pending(), 12);

        let lines = buf.push(b"ult\":42}\n");
        assert_eq!(lines, vec!["{\"id\":1,\"result\":42}".to_string()]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"first\nsecond\nthird\n");
        assert_eq!(
            lines,
            vec!["first".to_string(), "second".to_string(), "third".to_string()]
        );
    }

    #[test]
    fn test_trailing_partial_retained() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"complete\npart");
        assert_eq!(lines, vec!["complete".to_string()]);
        assert_eq!(buf.pending(), 4);

        let lines = buf.push(b"ial\n");
        assert_eq!(lines, vec!["partial".to_string()]);
    }

    #[test]
    fn test_no_complete_line_after_drain() {
        // The invariant: a drain pass never leaves a newline in the buffer
        let mut buf = LineBuffer::new();
        buf.push(b"a\nb\nc");
        assert_eq!(buf.pending(), 1);
        let lines = buf.push(b"\n");
        assert_eq!(lines, vec!["c".to_string()]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_crlf_stripped() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"{\"id\":2}\r\n");
        assert_eq!(lines, vec!["{\"id\":2}".to_string()]);
    }

    #[test]
    fn test_empty_lines_pass_through() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"\n\nx\n");
        assert_eq!(
            lines,
            vec![String::new(), String::new(), "x".to_string()]
        );
    }

    #[test]
    fn test_invalid_utf8_line_dropped() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"ok\n\xff\xfe\nalso ok\n");
        assert_eq!(lines, vec!["ok".to_string(), "also ok".to_string()]);
    }

    #[test]
    fn test_byte_at_a_time_delivery() {
        let mut buf = LineBuffer::new();
        let mut collected = Vec::new();
        for &b in b"{\"id\":9}\n".iter() {
            collected.extend(buf.push(&[b]));
        }
        assert_eq!(collected, vec!["{\"id\":9}".to_string()]);
    }
}

//! Byte stream → line decoder (spec §4.1).
//!
//! Accumulates raw bytes and splits them into complete lines on LF, with
//! CRLF coalesced into a single line break. A lone trailing `\r` at the end
//! of a chunk is held back until the next chunk arrives, since it might be
//! the first half of a CRLF pair. Incomplete UTF-8 sequences at a chunk
//! boundary are likewise held back rather than lossily decoded.

/// Splits an incoming byte stream into complete text lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    /// Construct an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every complete line it completes.
    /// Lines never include their terminator.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        self.drain_lines(false)
    }

    /// Flush any remaining buffered bytes as a final line (called at
    /// end-of-stream). Returns `None` if nothing remained.
    pub fn finish(&mut self) -> Option<String> {
        let lines = self.drain_lines(true);
        debug_assert!(lines.len() <= 1);
        lines.into_iter().next()
    }

    fn drain_lines(&mut self, flush: bool) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let Some(newline_pos) = self.buf.iter().position(|&b| b == b'\n') else {
                break;
            };
            let mut end = newline_pos;
            if end > 0 && self.buf[end - 1] == b'\r' {
                end -= 1;
            }
            let line_bytes: Vec<u8> = self.buf.drain(..=newline_pos).take(end).collect();
            lines.push(decode_lossy_boundary_safe(&line_bytes));
        }

        if flush && !self.buf.is_empty() {
            // A lone trailing `\r` with nothing after it is ambiguous until
            // more data arrives; at end-of-stream there is no more data, so
            // it is treated as ordinary content rather than a line break.
            let remaining = std::mem::take(&mut self.buf);
            lines.push(decode_lossy_boundary_safe(&remaining));
        }

        lines
    }
}

/// Decode a line's bytes as UTF-8. Lines are only ever handed to this
/// function once a full `\n`-terminated (or end-of-stream-flushed) chunk is
/// available, so a mid-sequence split cannot occur here; this still falls
/// back to lossy decoding defensively rather than panicking on malformed
/// input from a misbehaving producer.
fn decode_lossy_boundary_safe(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_lf() {
        let mut dec = LineDecoder::new();
        let lines = dec.push(b"hello\nworld\n");
        assert_eq!(lines, vec!["hello", "world"]);
    }

    #[test]
    fn coalesces_crlf() {
        let mut dec = LineDecoder::new();
        let lines = dec.push(b"hello\r\nworld\r\n");
        assert_eq!(lines, vec!["hello", "world"]);
    }

    #[test]
    fn holds_incomplete_line_across_chunks() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(b"hel").is_empty());
        let lines = dec.push(b"lo\n");
        assert_eq!(lines, vec!["hello"]);
    }

    #[test]
    fn holds_lone_trailing_cr_for_next_chunk() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(b"hello\r").is_empty());
        let lines = dec.push(b"\nworld\n");
        assert_eq!(lines, vec!["hello", "world"]);
    }

    #[test]
    fn finish_flushes_trailing_partial_line() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(b"no newline here").is_empty());
        assert_eq!(dec.finish(), Some("no newline here".to_string()));
        assert_eq!(dec.finish(), None);
    }

    #[test]
    fn holds_split_multibyte_utf8_across_chunks() {
        let mut dec = LineDecoder::new();
        let full = "héllo\n".as_bytes().to_vec();
        // split inside the 2-byte encoding of 'é'
        let (first, second) = full.split_at(2);
        assert!(dec.push(first).is_empty());
        let lines = dec.push(second);
        assert_eq!(lines, vec!["héllo"]);
    }
}

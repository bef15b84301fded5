/// Longest line kept in memory. Anything longer is reported once and
/// dropped up to its terminating newline.
pub const MAX_LINE_BYTES: usize = 1 << 20;

const PREVIEW_BYTES: usize = 200;

/// A body line that cannot be handed to the JSON decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// Lossy rendering of the start of the line, for the diagnostic log.
    pub preview: String,
    pub reason: String,
}

impl RejectedLine {
    fn new(raw: &[u8], reason: impl Into<String>) -> Self {
        let head = &raw[..raw.len().min(PREVIEW_BYTES)];
        Self {
            preview: String::from_utf8_lossy(head).trim().to_string(),
            reason: reason.into(),
        }
    }
}

pub type BodyLine = Result<String, RejectedLine>;

/// Line splitter for newline-delimited JSON response bodies.
///
/// Bytes are buffered until a `\n` arrives, so a line split across network
/// reads (or a multi-byte character split across reads) comes out whole.
pub struct NdjsonLines {
    buffer: Vec<u8>,
    // bytes of `buffer` already known to hold no newline
    scanned: usize,
    oversized: bool,
}

impl NdjsonLines {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            oversized: false,
        }
    }

    /// Feed raw bytes from the HTTP response. Returns every complete,
    /// non-blank line found so far, without the line terminator.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<BodyLine> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            if self.oversized {
                // tail of a line already reported
                self.oversized = false;
            } else if let Some(line) = decode_line(&self.buffer[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            self.scanned = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_LINE_BYTES {
            if !self.oversized {
                lines.push(Err(RejectedLine::new(
                    &self.buffer,
                    format!("line longer than {} bytes", MAX_LINE_BYTES),
                )));
                self.oversized = true;
            }
            self.buffer.clear();
            self.scanned = 0;
        }
        lines
    }

    /// Whatever is left once the body ends (a last line with no newline).
    pub fn finish(&mut self) -> Option<BodyLine> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        if std::mem::take(&mut self.oversized) {
            return None;
        }
        decode_line(&rest)
    }
}

impl Default for NdjsonLines {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_line(raw: &[u8]) -> Option<BodyLine> {
    match std::str::from_utf8(raw) {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(Ok(trimmed.to_string()))
            }
        }
        Err(e) => Some(Err(RejectedLine::new(raw, format!("invalid UTF-8: {}", e)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: Vec<BodyLine>) -> Vec<String> {
        lines.into_iter().map(|l| l.unwrap()).collect()
    }

    #[test]
    fn test_basic_lines() {
        let mut lines = NdjsonLines::new();
        let out = lines.feed(b"{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(texts(out), vec!["{\"a\":1}", "{\"b\":2}"]);
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut lines = NdjsonLines::new();
        let out = lines.feed(b"\n\r\n{\"a\":1}\r\n   \n");
        assert_eq!(texts(out), vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_split_across_chunks() {
        let mut lines = NdjsonLines::new();
        assert!(lines.feed(b"{\"message\":{\"con").is_empty());
        let out = lines.feed(b"tent\":\"hi\"}}\n{\"do");
        assert_eq!(texts(out), vec!["{\"message\":{\"content\":\"hi\"}}"]);
        assert_eq!(lines.finish(), Some(Ok("{\"do".to_string())));
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let bytes = "{\"c\":\"héllo\"}\n".as_bytes();
        // 'é' is two bytes; split between them
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut lines = NdjsonLines::new();
        assert!(lines.feed(&bytes[..split]).is_empty());
        let out = lines.feed(&bytes[split..]);
        assert_eq!(texts(out), vec!["{\"c\":\"héllo\"}"]);
    }

    #[test]
    fn test_invalid_utf8_line_is_rejected() {
        let mut lines = NdjsonLines::new();
        let out = lines.feed(b"{\"a\":1}\n{\"c\":\"bad\xff\"}\n{\"b\":2}\n");
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], Ok("{\"a\":1}".to_string()));
        let rejected = out[1].clone().unwrap_err();
        assert!(rejected.reason.starts_with("invalid UTF-8"));
        assert!(rejected.preview.starts_with("{\"c\":\"bad"));
        assert_eq!(out[2], Ok("{\"b\":2}".to_string()));
    }

    #[test]
    fn test_many_lines_in_one_chunk() {
        let body: String = (0..1000).map(|i| format!("{{\"n\":{}}}\n", i)).collect();
        let mut lines = NdjsonLines::new();
        let out = texts(lines.feed(body.as_bytes()));
        assert_eq!(out.len(), 1000);
        assert_eq!(out[999], "{\"n\":999}");
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_oversized_line_is_reported_once_and_dropped() {
        let mut lines = NdjsonLines::new();
        let blob = vec![b'x'; MAX_LINE_BYTES / 2 + 1];
        assert!(lines.feed(&blob).is_empty());
        let out = lines.feed(&blob);
        assert_eq!(out.len(), 1);
        assert!(out[0].clone().unwrap_err().reason.contains("longer than"));

        // the rest of the long line is swallowed, the next line survives
        let out = lines.feed(b"xxxx\n{\"a\":1}\n");
        assert_eq!(texts(out), vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_unterminated_oversized_line_is_not_returned_at_end() {
        let mut lines = NdjsonLines::new();
        lines.feed(&vec![b'x'; MAX_LINE_BYTES + 1]);
        lines.feed(b"more");
        assert_eq!(lines.finish(), None);
    }
}

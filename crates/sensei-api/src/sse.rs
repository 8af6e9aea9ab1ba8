//! Incremental parser for the tutor chat event stream.
//!
//! The response body is newline-delimited: comment lines (leading `:`),
//! blank separator lines, and `data: ` records carrying either a JSON
//! payload or the literal `[DONE]` sentinel.

use sensei_types::StreamPayload;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// An item produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// An incremental text fragment of the tutor's reply.
    Delta(String),
    /// The end-of-stream sentinel was seen.
    Done,
}

enum LineOutcome {
    Skip,
    Item(StreamItem),
    /// The payload did not parse as JSON — it was probably split across
    /// two network chunks and this line is the first half.
    Incomplete(String),
}

/// Incremental event-stream parser.
///
/// Owned exclusively by one streaming call; holds the bytes and text not
/// yet resolved into complete records.
pub struct DeltaParser {
    /// Bytes not yet decodable: a multi-byte char may legitimately span
    /// two chunks, so decoding has to be stateful.
    pending: Vec<u8>,
    /// Decoded text not yet resolved into complete lines.
    buf: String,
    done: bool,
}

impl DeltaParser {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            buf: String::new(),
            done: false,
        }
    }

    /// Feed a chunk of bytes and return any items it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamItem> {
        if self.done {
            return Vec::new();
        }
        self.decode(chunk);
        self.drain_lines(true)
    }

    /// Flush residual content at end of input.
    ///
    /// Applies the same line rules as [`feed`](Self::feed) but without the
    /// push-back retry: nothing more will ever arrive, so a genuinely
    /// incomplete trailing record is silently dropped rather than retried.
    pub fn finish(&mut self) -> Vec<StreamItem> {
        if self.done {
            return Vec::new();
        }
        // A dangling multi-byte tail can no longer be completed.
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.buf.push_str(&String::from_utf8_lossy(&tail));
        }

        let mut items = self.drain_lines(false);
        if self.done {
            self.buf.clear();
            return items;
        }

        // Whatever remains has no trailing newline; treat it as one final
        // candidate line.
        let rest = std::mem::take(&mut self.buf);
        let line = rest.strip_suffix('\r').unwrap_or(&rest);
        match self.parse_line(line) {
            LineOutcome::Item(item) => {
                if matches!(item, StreamItem::Done) {
                    self.done = true;
                }
                items.push(item);
            }
            LineOutcome::Skip | LineOutcome::Incomplete(_) => {}
        }
        items
    }

    /// Decode a chunk into the text buffer, holding back an incomplete
    /// multi-byte suffix for the next chunk.
    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buf.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        self.buf.push_str(text);
                    }
                    match e.error_len() {
                        // Incomplete trailing sequence: wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                        // Definitely invalid bytes: replace and move on.
                        Some(len) => {
                            self.buf.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self, allow_push_back: bool) -> Vec<StreamItem> {
        let mut items = Vec::new();
        while !self.done {
            let Some(newline) = self.buf.find('\n') else {
                break;
            };
            let raw: String = self.buf.drain(..=newline).collect();
            let line = raw.trim_end_matches('\n');
            let line = line.strip_suffix('\r').unwrap_or(line);

            match self.parse_line(line) {
                LineOutcome::Skip => {}
                LineOutcome::Item(item) => {
                    if matches!(item, StreamItem::Done) {
                        self.done = true;
                    }
                    items.push(item);
                }
                LineOutcome::Incomplete(payload) => {
                    if allow_push_back {
                        // Reconstruct the record at the front of the buffer
                        // and stop extracting until more bytes arrive. The
                        // next chunk appends to the tail, completing the
                        // JSON. Discarding here would drop characters;
                        // re-parsing without new data would spin forever.
                        let rest = std::mem::take(&mut self.buf);
                        self.buf = if rest.is_empty() {
                            format!("{DATA_PREFIX}{payload}")
                        } else {
                            format!("{DATA_PREFIX}{payload}\n{rest}")
                        };
                        break;
                    }
                    // Final flush: nothing more is coming; drop it.
                }
            }
        }
        items
    }

    fn parse_line(&self, line: &str) -> LineOutcome {
        if line.is_empty() || line.starts_with(':') {
            return LineOutcome::Skip;
        }
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            tracing::debug!("skipping non-data stream line");
            return LineOutcome::Skip;
        };
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return LineOutcome::Item(StreamItem::Done);
        }

        match serde_json::from_str::<serde_json::Value>(payload) {
            // Valid JSON with an unexpected shape yields no delta; only
            // unparseable text is treated as a chunk split.
            Ok(value) => match serde_json::from_value::<StreamPayload>(value) {
                Ok(record) => match record.delta_content() {
                    Some(text) => LineOutcome::Item(StreamItem::Delta(text.to_string())),
                    None => LineOutcome::Skip,
                },
                Err(_) => LineOutcome::Skip,
            },
            Err(_) => LineOutcome::Incomplete(payload.to_string()),
        }
    }
}

impl Default for DeltaParser {
    fn default() -> Self {
        Self::new()
    }
}

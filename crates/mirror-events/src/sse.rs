//! Incremental `text/event-stream` decoder.
//!
//! Chunks arrive at arbitrary byte boundaries (including mid-UTF-8), so the
//! decoder buffers raw bytes and only decodes a block once its terminating
//! blank line has arrived.

/// One dispatched SSE event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` field, if present.
    pub event: Option<String>,
    /// `id:` field, if present.
    pub id: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Buffers stream chunks and yields complete frames.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every frame it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(pos) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(frame) = parse_block(&block[..pos]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Feed a text chunk.
    pub fn push_str(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.push(chunk.as_bytes())
    }

    /// Bytes waiting for a terminating blank line.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Flush a trailing block left unterminated when the stream ended.
    pub fn finish(mut self) -> Option<SseFrame> {
        let block = std::mem::take(&mut self.buffer);
        parse_block(&block)
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(block);
    let mut frame = SseFrame::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => data_lines.push(value),
            "event" => frame.event = Some(value.to_owned()),
            "id" => frame.id = Some(value.to_owned()),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    frame.data = data_lines.join("\n");
    Some(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push_str("data: {\"a\":1}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"a\":1}");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push_str("event: message\ndata: hel").is_empty());
        let frames = decoder.push_str("lo\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("message"));
        assert_eq!(frames[0].data, "hello");
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        let bytes = "data: héllo\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        let frames = decoder.push(&bytes[split..]);
        assert_eq!(frames[0].data, "héllo");
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push_str("data: one\ndata: two\nid: 7\n\n");
        assert_eq!(frames[0].data, "one\ntwo");
        assert_eq!(frames[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push_str("data: x\r\n\r\ndata: y\r\n\r\n");
        let data: Vec<_> = frames.iter().map(|f| f.data.as_str()).collect();
        assert_eq!(data, ["x", "y"]);
    }

    #[test]
    fn comments_and_dataless_frames_skipped() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push_str(": keepalive\n\nevent: ping\n\ndata: real\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "real");
    }

    #[test]
    fn finish_flushes_trailing_block() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push_str("data: tail").is_empty());
        assert_eq!(decoder.finish().unwrap().data, "tail");
    }
}

//! Minimal Server-Sent-Events frame parser for chunked response bodies.
//!
//! Chunk boundaries do not align with event boundaries, so bytes are
//! buffered and frames are emitted only once their terminating blank
//! line has arrived.

/// One parsed SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: String,
    current_event: Option<String>,
    current_data: String,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk, returning every frame it completed.
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some(newline_pos) = self.buffer.find('\n') {
            let line: String = self.buffer[..newline_pos].trim().to_string();
            self.buffer = self.buffer[newline_pos + 1..].to_string();

            if line.is_empty() {
                if !self.current_data.is_empty() {
                    frames.push(SseFrame {
                        event: self.current_event.take(),
                        data: std::mem::take(&mut self.current_data),
                    });
                }
                self.current_event = None;
                continue;
            }

            if let Some(event_type) = line.strip_prefix("event:") {
                self.current_event = Some(event_type.trim().to_string());
            } else if let Some(data) = line.strip_prefix("data:") {
                if !self.current_data.is_empty() {
                    self.current_data.push('\n');
                }
                self.current_data.push_str(data.trim());
            }
        }

        frames
    }
}

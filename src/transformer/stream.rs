//! SSE framing for the streaming relay.
//!
//! Upstream bytes arrive in arbitrary chunks. [`SseFramer`] reassembles them
//! into whole `\n\n`-terminated events so the client always receives complete
//! events regardless of how the network split them.

const EVENT_DELIMITER: &str = "\n\n";

/// Incremental byte-to-event framer.
#[derive(Debug, Default)]
pub struct SseFramer {
    buffer: String,
    /// Trailing bytes of a UTF-8 sequence split across reads.
    pending: Vec<u8>,
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find(EVENT_DELIMITER) {
            let rest = self.buffer.split_off(pos + EVENT_DELIMITER.len());
            let block = std::mem::replace(&mut self.buffer, rest);
            let block = &block[..pos];
            if !block.trim().is_empty() {
                events.push(format!("{}{}", block, EVENT_DELIMITER));
            }
        }
        events
    }

    /// Flush whatever remains once the upstream closed.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        let remainder = std::mem::take(&mut self.buffer);
        if remainder.trim().is_empty() {
            None
        } else {
            Some(format!("{}{}", remainder, EVENT_DELIMITER))
        }
    }

    /// Bytes not yet emitted as an event.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.pending.len()
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    // Safe: the prefix was just validated.
                    if let Ok(valid) = std::str::from_utf8(&self.pending[start..valid_end]) {
                        self.buffer.push_str(valid);
                    }
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            self.pending.drain(..valid_end);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Format an SSE event with an optional event name.
pub fn format_sse_event(event: Option<&str>, data: &str) -> String {
    let mut output = String::new();

    if let Some(event_name) = event {
        output.push_str("event: ");
        output.push_str(event_name);
        output.push('\n');
    }

    for line in data.lines() {
        output.push_str("data: ");
        output.push_str(line);
        output.push('\n');
    }

    output.push('\n');
    output
}

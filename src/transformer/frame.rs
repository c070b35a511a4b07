//! SSE line classification.
//!
//! Each raw line from the backend event stream is one of: blank, a control
//! field (`event:`, `id:`, `retry:`), the `[DONE]` sentinel, or a data
//! payload. Only payloads are handed on for conversion.

/// Prefix of an SSE data line, stripped before conversion.
pub const SSE_DATA_PREFIX: &str = "data: ";

/// Sentinel payload marking the end of an OpenAI-style stream.
pub const SSE_DONE_MARKER: &str = "[DONE]";

const CONTROL_FIELD_PREFIXES: [&str; 3] = ["event:", "id:", "retry:"];

/// Classification of one event-stream line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    Blank,
    Control,
    Done,
    Data(&'a str),
}

impl<'a> Frame<'a> {
    /// Classify a raw line. Never fails; lines without the `data: ` prefix
    /// are treated as a bare payload.
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Frame::Blank;
        }

        if CONTROL_FIELD_PREFIXES
            .iter()
            .any(|prefix| line.starts_with(prefix))
        {
            return Frame::Control;
        }

        let payload = line.strip_prefix(SSE_DATA_PREFIX).unwrap_or(line);
        if payload == SSE_DONE_MARKER {
            return Frame::Done;
        }

        Frame::Data(payload)
    }

    /// The payload to convert, if this frame carries one.
    pub fn payload(self) -> Option<&'a str> {
        match self {
            Frame::Data(payload) => Some(payload),
            Frame::Blank | Frame::Control | Frame::Done => None,
        }
    }
}

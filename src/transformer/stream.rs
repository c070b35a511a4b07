//! SSE → NDJSON stream transcoding.
//!
//! [`StreamTranscoder`] decorates a [`ResponseSink`]. Every write from the
//! backend relay is buffered until it completes one or more lines; complete
//! lines are classified, converted into plugin records and written to the
//! sink as a single block, followed by an immediate flush so the client sees
//! output with the same cadence as the backend.

use super::frame::Frame;
use super::record::{convert_payload, Conversion};
use crate::core::error_types::{
    LINE_OUTCOME_CONVERTED, LINE_OUTCOME_DROPPED, LINE_OUTCOME_PASSTHROUGH,
};
use crate::core::metrics::get_metrics;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

// ============================================================================
// Sink abstraction
// ============================================================================

/// Raw bidirectional connection handed out by a connection takeover.
pub trait RawIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RawIo for T {}

pub type RawConnection = Box<dyn RawIo>;

/// Destination of transcoded bytes.
///
/// `flush` must push everything written so far to the transport. Sinks that
/// can surrender their underlying connection override [`ResponseSink::hijack`].
pub trait ResponseSink: Write + Send {
    fn hijack(&mut self) -> io::Result<RawConnection> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "response sink does not support connection takeover",
        ))
    }
}

impl ResponseSink for Vec<u8> {}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("response sink failed: {0}")]
    Sink(#[from] io::Error),

    #[error("transcoder lock poisoned")]
    LockPoisoned,
}

impl From<TranscodeError> for io::Error {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::Sink(e) => e,
            TranscodeError::LockPoisoned => io::Error::other("transcoder lock poisoned"),
        }
    }
}

// ============================================================================
// Line conversion
// ============================================================================

/// Run one raw line through frame classification and record conversion.
///
/// Returns `None` for lines that produce no output.
pub fn convert_line(line: &str) -> Option<String> {
    let transcoded_lines = &get_metrics().transcoded_lines;

    let Some(payload) = Frame::classify(line).payload() else {
        transcoded_lines
            .with_label_values(&[LINE_OUTCOME_DROPPED])
            .inc();
        return None;
    };

    let conversion = convert_payload(payload);
    let outcome = match &conversion {
        Conversion::Converted(_) => LINE_OUTCOME_CONVERTED,
        Conversion::Passthrough(_) => LINE_OUTCOME_PASSTHROUGH,
    };
    transcoded_lines.with_label_values(&[outcome]).inc();

    Some(conversion.into_line()).filter(|line| !line.is_empty())
}

// ============================================================================
// Transcoder
// ============================================================================

struct Inner<S> {
    /// Bytes written so far that do not yet end in `\n`.
    buffer: Vec<u8>,
    sink: S,
}

/// Line-reassembling SSE → NDJSON writer around a response sink.
///
/// One instance per response stream. All buffer and sink access is
/// serialized by a single mutex held for the whole of each call, so
/// [`write`](Self::write) and [`flush`](Self::flush) may be called from
/// different threads.
pub struct StreamTranscoder<S> {
    inner: Mutex<Inner<S>>,
}

impl<S: ResponseSink> StreamTranscoder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffer: Vec::new(),
                sink,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<S>>, TranscodeError> {
        self.inner.lock().map_err(|_| TranscodeError::LockPoisoned)
    }

    /// Accept bytes from the backend relay.
    ///
    /// Always reports the full input length as accepted; the number of bytes
    /// forwarded to the sink differs.
    pub fn write(&self, data: &[u8]) -> Result<usize, TranscodeError> {
        let mut inner = self.lock()?;
        inner.buffer.extend_from_slice(data);

        let Some(last_newline) = inner.buffer.iter().rposition(|&b| b == b'\n') else {
            return Ok(data.len());
        };

        let remaining = inner.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut inner.buffer, remaining);

        let mut output = String::new();
        for raw in complete[..last_newline].split(|&b| b == b'\n') {
            if let Some(converted) = convert_line(&String::from_utf8_lossy(raw)) {
                output.push_str(&converted);
                output.push('\n');
            }
        }

        if !output.is_empty() {
            inner.sink.write_all(output.as_bytes())?;
            inner.sink.flush()?;
        }

        Ok(data.len())
    }

    /// Drain the trailing partial line, if any, and flush the sink.
    ///
    /// An unterminated remainder is treated as a complete line.
    pub fn flush(&self) -> Result<(), TranscodeError> {
        let mut inner = self.lock()?;

        if !inner.buffer.is_empty() {
            let remainder = std::mem::take(&mut inner.buffer);
            if let Some(mut converted) = convert_line(&String::from_utf8_lossy(&remainder)) {
                tracing::debug!(
                    bytes = remainder.len(),
                    "Emitting unterminated trailing line at end of stream"
                );
                converted.push('\n');
                inner.sink.write_all(converted.as_bytes())?;
            }
        }

        inner.sink.flush()?;
        Ok(())
    }

    /// Flush and hand back the wrapped sink.
    pub fn finish(self) -> Result<S, TranscodeError> {
        self.flush()?;
        self.inner
            .into_inner()
            .map(|inner| inner.sink)
            .map_err(|_| TranscodeError::LockPoisoned)
    }

    /// Forward a connection takeover to the wrapped sink.
    pub fn hijack(&self) -> io::Result<RawConnection> {
        self.lock()?.sink.hijack()
    }

    /// Run `f` against the wrapped sink while holding the transcoder lock.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R, TranscodeError> {
        let mut inner = self.lock()?;
        Ok(f(&mut inner.sink))
    }

    /// Number of bytes held back waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.buffer.len())
            .unwrap_or(0)
    }
}

impl<S: ResponseSink> Write for &StreamTranscoder<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(StreamTranscoder::write(*self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(StreamTranscoder::flush(*self)?)
    }
}

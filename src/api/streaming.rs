//! Response-body plumbing for NDJSON transcoding.
//!
//! [`transcode_stream`] maps the relay's SSE body through a
//! [`StreamTranscoder`] wrapped around a [`BodySink`]. The upstream is read
//! only while the client polls the response body, so a slow client holds the
//! backend back and at most one upstream chunk worth of output is buffered.
//! Dropping the response body drops the upstream stream with it.

use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use crate::transformer::{ResponseSink, StreamTranscoder};
use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures::{stream, Stream, StreamExt};
use std::fmt::Display;
use std::io::{self, Write};
use std::pin::Pin;
use tracing::Instrument;

/// Sink backing a streaming response body.
///
/// Writes accumulate until `flush`; only flushed bytes are handed to the
/// body by [`take_ready`](Self::take_ready).
#[derive(Debug, Default)]
pub struct BodySink {
    pending: BytesMut,
    ready: BytesMut,
}

impl BodySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything flushed since the last call, if anything.
    pub fn take_ready(&mut self) -> Option<Bytes> {
        if self.ready.is_empty() {
            None
        } else {
            Some(self.ready.split().freeze())
        }
    }
}

impl Write for BodySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let flushed = self.pending.split();
        self.ready.unsplit(flushed);
        Ok(())
    }
}

impl ResponseSink for BodySink {}

/// Decrements the active-stream gauge when the response body is dropped.
struct ActiveStreamGuard {
    endpoint: String,
}

impl ActiveStreamGuard {
    fn new(endpoint: String) -> Self {
        get_metrics()
            .active_streams
            .with_label_values(&[&endpoint])
            .inc();
        Self { endpoint }
    }
}

impl Drop for ActiveStreamGuard {
    fn drop(&mut self) {
        get_metrics()
            .active_streams
            .with_label_values(&[&self.endpoint])
            .dec();
    }
}

/// State of one transcoded response body.
struct Relay<B> {
    upstream: Pin<Box<B>>,
    /// `None` once the transcoder has been finished.
    transcoder: Option<StreamTranscoder<BodySink>>,
    /// Upstream failure reported to the client after the tail is emitted.
    failure: Option<io::Error>,
    chunks: usize,
    bytes: usize,
    span: tracing::Span,
    _active: ActiveStreamGuard,
}

impl<B, E> Relay<B>
where
    B: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    /// Read upstream until the transcoder has flushed output for the client.
    async fn next_block(&mut self) -> Option<io::Result<Bytes>> {
        loop {
            if self.transcoder.is_none() {
                return self.failure.take().map(Err);
            }

            match self.upstream.next().await {
                Some(Ok(chunk)) => {
                    self.chunks += 1;
                    self.bytes += chunk.len();

                    let transcoder = self.transcoder.as_ref()?;
                    let ready = transcoder
                        .write(&chunk)
                        .and_then(|_| transcoder.with_sink(BodySink::take_ready));
                    match ready {
                        Ok(Some(block)) => return Some(Ok(block)),
                        Ok(None) => {}
                        Err(e) => {
                            self.transcoder = None;
                            return Some(Err(e.into()));
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        error = %e,
                        chunks = self.chunks,
                        bytes = self.bytes,
                        "Upstream stream failed, ending client stream with an error"
                    );
                    self.failure = Some(io::Error::other(e.to_string()));
                    if let Some(block) = self.finish() {
                        return Some(block);
                    }
                }
                None => {
                    tracing::debug!(
                        chunks = self.chunks,
                        bytes = self.bytes,
                        "Stream transcoding complete"
                    );
                    if let Some(block) = self.finish() {
                        return Some(block);
                    }
                }
            }
        }
    }

    /// Finish the transcoder and return its last block, if any.
    fn finish(&mut self) -> Option<io::Result<Bytes>> {
        let transcoder = self.transcoder.take()?;
        match transcoder.finish() {
            Ok(mut sink) => sink.take_ready().map(Ok),
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Transcode an SSE byte stream into NDJSON blocks, pulled on demand.
pub fn transcode_stream<B, E>(
    upstream: B,
    endpoint: String,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    B: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display,
{
    let relay = Relay {
        upstream: Box::pin(upstream),
        transcoder: Some(StreamTranscoder::new(BodySink::new())),
        failure: None,
        chunks: 0,
        bytes: 0,
        span: tracing::info_span!("ndjson_stream", request_id = %get_request_id()),
        _active: ActiveStreamGuard::new(endpoint),
    };

    stream::unfold(relay, |mut relay| async move {
        let span = relay.span.clone();
        let block = relay.next_block().instrument(span).await?;
        Some((block, relay))
    })
}

/// Swap an SSE response body for its NDJSON transcoding.
pub fn transcode_response_body(body: Body, endpoint: String) -> Body {
    Body::from_stream(transcode_stream(body.into_data_stream(), endpoint))
}

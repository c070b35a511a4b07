//! Transformer module for Augment ↔ OpenAI conversion.
//!
//! Two directions are handled:
//!
//! 1. [`request`]: the plugin's `chat-stream` request is translated once into
//!    a canonical streaming chat-completion request.
//! 2. [`stream`]: the backend's SSE response is transcoded line by line into
//!    the plugin's NDJSON record format as it arrives.
//!
//! ```text
//! backend SSE bytes
//!     ↓
//! [StreamTranscoder]   ← reassemble complete lines
//!     ↓
//! [Frame::classify]    ← drop control/blank/[DONE], strip "data: "
//!     ↓
//! [convert_payload]    ← chat chunk → BackChatResult (or passthrough)
//!     ↓
//! [StopCode]           ← finish_reason → stop_reason
//!     ↓
//! NDJSON to the client
//! ```

pub mod finish_reason;
pub mod frame;
pub mod record;
pub mod request;
pub mod stream;

pub use finish_reason::StopCode;
pub use frame::{Frame, SSE_DATA_PREFIX, SSE_DONE_MARKER};
pub use record::{convert_payload, BackendStreamEvent, Conversion, Node, PluginOutputRecord};
pub use request::{
    build_user_content, decode_third_party_override, resolve_model, translate_request,
    ModelSource, OverrideError, ResolvedModel,
};
pub use stream::{convert_line, RawConnection, ResponseSink, StreamTranscoder, TranscodeError};

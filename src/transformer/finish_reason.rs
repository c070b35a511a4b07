//! Backend completion reason → plugin stop code.

use serde::{Serialize, Serializer};

/// Why a generation turn ended, as the plugin encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StopCode {
    EndTurn = 1,
    MaxTokens = 2,
    ToolUse = 3,
}

/// Exact-match vocabulary; anything not listed maps to [`StopCode::EndTurn`].
const FINISH_REASONS: &[(&str, StopCode)] = &[
    ("stop", StopCode::EndTurn),
    ("end_turn", StopCode::EndTurn),
    ("length", StopCode::MaxTokens),
    ("max_tokens", StopCode::MaxTokens),
    ("tool_calls", StopCode::ToolUse),
    ("function_call", StopCode::ToolUse),
    ("tool_use", StopCode::ToolUse),
];

impl StopCode {
    /// Map a backend `finish_reason` to a stop code.
    ///
    /// Matching is case-sensitive.
    pub fn from_finish_reason(reason: &str) -> Self {
        FINISH_REASONS
            .iter()
            .find(|(name, _)| *name == reason)
            .map(|(_, code)| *code)
            .unwrap_or(StopCode::EndTurn)
    }

    /// Numeric wire value.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl Serialize for StopCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

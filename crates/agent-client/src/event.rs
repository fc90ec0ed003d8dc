//! Normalized agent events

use serde::{Deserialize, Serialize};

/// Events produced by one conversation turn, after normalization
///
/// One closed set of variants regardless of how the upstream runtime shapes
/// its output; see [`crate::normalize`] for the mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Runtime initialized and issued a resume token for this conversation
    SystemInit { session_id: String },

    /// A chunk of assistant prose
    AssistantText { text: String },

    /// The agent invoked a tool
    ToolInvocation {
        name: String,
        id: String,
        input: serde_json::Value,
    },

    /// A tool produced its result
    ToolResult {
        tool_use_id: String,
        content: serde_json::Value,
        is_error: bool,
    },

    /// Turn finished successfully
    ResultSuccess {
        result: Option<String>,
        cost: Option<f64>,
        duration_ms: Option<u64>,
    },

    /// Turn finished unsuccessfully; `reason` is the upstream result subtype
    ResultFailure { reason: String },

    /// The runtime failed in-band (unreachable, misconfigured, crashed)
    Error { error: String, details: String },
}

impl AgentEvent {
    /// True for the events that end a turn's stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ResultSuccess { .. } | Self::ResultFailure { .. } | Self::Error { .. }
        )
    }
}

//! Error types for the agent adapter

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur while driving the agent runtime
///
/// These never cross the adapter boundary to stream consumers; they are
/// converted into an in-band [`crate::AgentEvent::Error`] before delivery.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Failed to spawn the agent process
    #[error("Failed to spawn agent process `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Agent process has no capturable stdout
    #[error("Agent process stdout unavailable")]
    NoStdout,

    /// IO error while reading the event stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Human-readable error plus detail for the in-band error event
    pub fn into_event(self) -> crate::AgentEvent {
        let details = match &self {
            AgentError::SpawnFailed { source, .. } => source.to_string(),
            AgentError::NoStdout => String::new(),
            AgentError::Io(e) => e.to_string(),
        };
        crate::AgentEvent::Error {
            error: self.to_string(),
            details,
        }
    }
}

//! Wire protocol for the chat relay
//!
//! Inbound and outbound messages are JSON objects discriminated by a `type`
//! field, with camelCase payload fields to match the browser client.

use agent_client::AgentEvent;
use ea_core::mail::MailRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Messages received from clients
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Chat {
        #[serde(default)]
        content: String,
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        new_conversation: bool,
    },
    #[serde(rename_all = "camelCase")]
    Subscribe { session_id: String },
    #[serde(rename_all = "camelCase")]
    Unsubscribe { session_id: String },
    RequestInbox,
}

/// Messages sent to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Connected {
        message: String,
        available_sessions: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    UserMessage { content: String, session_id: String },
    #[serde(rename_all = "camelCase")]
    AssistantMessage { content: String, session_id: String },
    #[serde(rename_all = "camelCase")]
    ToolUse {
        tool_name: String,
        tool_id: String,
        tool_input: Value,
        session_id: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_use_id: String,
        content: Value,
        is_error: bool,
        session_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        session_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Subscribed { session_id: String },
    #[serde(rename_all = "camelCase")]
    Unsubscribed { session_id: String },
    InboxUpdate { emails: Vec<MailRecord> },
}

/// Inbound decode errors, both answered in-band
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Malformed message: {0}")]
    Malformed(String),
}

const KNOWN_TYPES: &[&str] = &["chat", "subscribe", "unsubscribe", "request_inbox"];

/// Decode an inbound frame, preserving an unknown `type` tag for the reply
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::Malformed("missing `type` field".to_string()))?
        .to_string();

    serde_json::from_value(value).map_err(|e| {
        if KNOWN_TYPES.contains(&kind.as_str()) {
            ProtocolError::Malformed(e.to_string())
        } else {
            ProtocolError::UnknownType(kind)
        }
    })
}

impl ServerMessage {
    /// Map one normalized agent event onto the wire
    ///
    /// `SystemInit` is bookkeeping (the resume token is persisted onto the
    /// session) and has no wire representation.
    pub fn from_agent_event(event: AgentEvent, session_id: &str) -> Option<Self> {
        let session_id = session_id.to_string();
        match event {
            AgentEvent::SystemInit { .. } => None,
            AgentEvent::AssistantText { text } => Some(Self::AssistantMessage {
                content: text,
                session_id,
            }),
            AgentEvent::ToolInvocation { name, id, input } => Some(Self::ToolUse {
                tool_name: name,
                tool_id: id,
                tool_input: input,
                session_id,
            }),
            AgentEvent::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some(Self::ToolResult {
                tool_use_id,
                content,
                is_error,
                session_id,
            }),
            AgentEvent::ResultSuccess {
                result,
                cost,
                duration_ms,
            } => Some(Self::Result {
                success: true,
                result,
                cost,
                duration: duration_ms,
                error: None,
                session_id,
            }),
            AgentEvent::ResultFailure { reason } => Some(Self::Result {
                success: false,
                result: None,
                cost: None,
                duration: None,
                error: Some(reason),
                session_id,
            }),
            AgentEvent::Error { error, details } => Some(Self::Error {
                error,
                details: (!details.is_empty()).then_some(details),
                session_id: Some(session_id),
            }),
        }
    }
}

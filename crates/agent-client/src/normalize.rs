//! Raw event normalization
//!
//! The runtime emits heterogeneous JSON objects discriminated by a `type`
//! field, with assistant content either as a plain string or a list of typed
//! blocks. This module flattens each raw event into zero or more
//! [`AgentEvent`]s, in block order. Unrecognized raw events normalize to
//! nothing.

use serde_json::Value;
use tracing::debug;

use crate::event::AgentEvent;

/// Normalize one raw runtime event
pub fn normalize(raw: &Value) -> Vec<AgentEvent> {
    match raw.get("type").and_then(Value::as_str) {
        Some("system") => normalize_system(raw),
        Some("assistant") => normalize_assistant(raw),
        Some("result") => normalize_result(raw),
        Some("error") => vec![AgentEvent::Error {
            error: str_field(raw, "error").unwrap_or_else(|| "Unknown error".to_string()),
            details: str_field(raw, "details").unwrap_or_default(),
        }],
        other => {
            debug!("Dropping unrecognized agent event type: {:?}", other);
            Vec::new()
        }
    }
}

fn normalize_system(raw: &Value) -> Vec<AgentEvent> {
    // Only the init subtype matters: it carries the resume token.
    if raw.get("subtype").and_then(Value::as_str) != Some("init") {
        return Vec::new();
    }
    match str_field(raw, "session_id") {
        Some(session_id) => vec![AgentEvent::SystemInit { session_id }],
        None => Vec::new(),
    }
}

fn normalize_assistant(raw: &Value) -> Vec<AgentEvent> {
    let content = raw.pointer("/message/content").unwrap_or(&Value::Null);

    match content {
        Value::String(text) => vec![AgentEvent::AssistantText { text: text.clone() }],
        Value::Array(blocks) => blocks.iter().filter_map(normalize_block).collect(),
        _ => Vec::new(),
    }
}

fn normalize_block(block: &Value) -> Option<AgentEvent> {
    match block.get("type").and_then(Value::as_str)? {
        "text" => Some(AgentEvent::AssistantText {
            text: str_field(block, "text").unwrap_or_default(),
        }),
        "tool_use" => Some(AgentEvent::ToolInvocation {
            name: str_field(block, "name").unwrap_or_default(),
            id: str_field(block, "id").unwrap_or_default(),
            input: block.get("input").cloned().unwrap_or(Value::Null),
        }),
        "tool_result" => Some(AgentEvent::ToolResult {
            tool_use_id: str_field(block, "tool_use_id").unwrap_or_default(),
            content: block.get("content").cloned().unwrap_or(Value::Null),
            is_error: block
                .get("is_error")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }),
        _ => None,
    }
}

fn normalize_result(raw: &Value) -> Vec<AgentEvent> {
    match raw.get("subtype").and_then(Value::as_str) {
        Some("success") => vec![AgentEvent::ResultSuccess {
            result: str_field(raw, "result"),
            cost: raw.get("total_cost_usd").and_then(Value::as_f64),
            duration_ms: raw.get("duration_ms").and_then(Value::as_u64),
        }],
        Some(subtype) => vec![AgentEvent::ResultFailure {
            reason: subtype.to_string(),
        }],
        None => vec![AgentEvent::ResultFailure {
            reason: "unknown".to_string(),
        }],
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

//! Agent runtime adapter
//!
//! Invokes the external conversational agent and turns its raw, loosely-typed
//! event stream into a normalized sequence of [`AgentEvent`]s. Everything
//! upstream-shape-specific is decided here; consumers only ever see the
//! normalized variants.

mod client;
mod error;
mod event;
mod normalize;

pub use client::{CliAgentRuntime, RuntimeConfig};
pub use error::{AgentError, Result};
pub use event::AgentEvent;
pub use normalize::normalize;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Interface to the agent runtime
///
/// A call produces a finite stream of events: the channel yields events in
/// upstream order and closes after a result or error event. Faults never
/// escape the adapter; a misconfigured or unreachable runtime shows up as a
/// single in-band [`AgentEvent::Error`].
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run one conversation turn
    ///
    /// `resume` is the opaque token from a previous turn's
    /// [`AgentEvent::SystemInit`]; `None` starts a fresh conversation.
    async fn stream_query(&self, prompt: &str, resume: Option<&str>)
        -> mpsc::Receiver<AgentEvent>;
}

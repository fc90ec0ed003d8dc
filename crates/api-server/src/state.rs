//! Application state

use std::sync::Arc;

use agent_client::AgentRuntime;
use ea_core::mail::MailRepository;

use crate::relay::{Fanout, SessionRegistry};

/// Shared application state, injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub fanout: Arc<Fanout>,
    pub mail: Arc<dyn MailRepository>,
    pub agent: Arc<dyn AgentRuntime>,
}

impl AppState {
    pub fn new(mail: Arc<dyn MailRepository>, agent: Arc<dyn AgentRuntime>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            fanout: Arc::new(Fanout::new()),
            mail,
            agent,
        }
    }
}

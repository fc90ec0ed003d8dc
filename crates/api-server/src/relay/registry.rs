//! Session registry
//!
//! Owns the map from session id to conversation state. A session is a
//! logical conversation identity: it outlives any single connection and is
//! retired only by explicit cleanup, so reconnecting clients can resume it.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Conversation state for one session
#[derive(Debug, Clone)]
pub struct Session {
    /// Immutable after creation
    pub id: String,
    /// Opaque runtime token allowing a later turn to continue the
    /// conversation; `None` means "start fresh"
    pub resume_token: Option<String>,
    /// Chat messages processed on this session
    pub turns: u64,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            resume_token: None,
            turns: 0,
            created_at: Utc::now(),
        }
    }
}

/// Registry of live sessions
///
/// Every operation is total: unknown ids are no-ops, never errors.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_session_id() -> String {
        let suffix: u16 = rand::thread_rng().gen_range(1000..10000);
        format!("session-{}-{}", Utc::now().timestamp_millis(), suffix)
    }

    /// Return the session for `id`, creating it when unknown or absent
    ///
    /// A known id comes back unchanged; a new session starts with no resume
    /// token and a zero turn count.
    pub async fn get_or_create(&self, id: Option<&str>) -> Session {
        let mut sessions = self.sessions.write().await;
        if let Some(id) = id {
            if let Some(session) = sessions.get(id) {
                return session.clone();
            }
        }

        let new_id = id
            .map(str::to_string)
            .unwrap_or_else(Self::generate_session_id);
        let session = Session::new(new_id.clone());
        info!("Created new session: {}", new_id);
        sessions.insert(new_id, session.clone());
        session
    }

    /// Snapshot of a session, if it exists
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Forget the conversation context; the session itself stays
    pub async fn end_conversation(&self, id: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.resume_token = None;
            info!("Ended conversation for session {}", id);
        }
    }

    /// Persist the runtime-issued resume token
    pub async fn set_resume_token(&self, id: &str, token: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.resume_token = Some(token.to_string());
            debug!("Captured resume token for session {}", id);
        }
    }

    /// Current resume token, if any
    pub async fn resume_token(&self, id: &str) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(id)
            .and_then(|s| s.resume_token.clone())
    }

    /// Count one processed chat message
    pub async fn record_turn(&self, id: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.turns += 1;
        }
    }

    /// Retire a session entirely
    pub async fn cleanup(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            info!("Cleaned up session {}", id);
        }
    }

    pub async fn list_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

//! Subscription fanout
//!
//! Maps each session to the set of connections subscribed to it and delivers
//! broadcasts to all of them. Delivery failures never abort a broadcast; a
//! connection whose send fails is pruned from the subscriber set so dead
//! peers heal out on their own.

use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::protocol::ServerMessage;

/// Send handle for one WebSocket client
///
/// The transport owns the socket; this is only the outbound channel feeding
/// the connection's forward task, plus an id for set membership.
#[derive(Clone)]
pub struct ClientConnection {
    pub id: Uuid,
    tx: mpsc::Sender<String>,
}

impl ClientConnection {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
        }
    }

    /// Queue a raw frame; fails when the peer is gone
    pub async fn send_text(&self, text: String) -> Result<(), mpsc::error::SendError<String>> {
        self.tx.send(text).await
    }

    /// Serialize and send one message directly to this connection
    ///
    /// Send failures are logged and swallowed; disconnect cleanup handles
    /// the rest.
    pub async fn send_message(&self, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(text) => {
                if self.send_text(text).await.is_err() {
                    debug!("Dropped message to closed connection {}", self.id);
                }
            }
            Err(e) => warn!("Failed to serialize server message: {}", e),
        }
    }
}

/// Connection table plus per-session subscriber sets
#[derive(Default)]
pub struct Fanout {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
    subscribers: RwLock<HashMap<String, HashSet<Uuid>>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly accepted connection
    pub async fn register(&self, conn: ClientConnection) {
        self.connections.write().await.insert(conn.id, conn);
    }

    /// Drop a closed connection and remove it from every subscriber set
    pub async fn deregister(&self, conn_id: Uuid) {
        self.connections.write().await.remove(&conn_id);
        let mut subscribers = self.subscribers.write().await;
        for set in subscribers.values_mut() {
            set.remove(&conn_id);
        }
    }

    /// Add a connection to a session's subscriber set
    ///
    /// The set is created on demand, so subscription order relative to
    /// session creation does not matter.
    pub async fn subscribe(&self, session_id: &str, conn_id: Uuid) {
        self.subscribers
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .insert(conn_id);
        debug!("Connection {} subscribed to session {}", conn_id, session_id);
    }

    /// Remove a connection from a session's set; no-op if absent
    pub async fn unsubscribe(&self, session_id: &str, conn_id: Uuid) {
        if let Some(set) = self.subscribers.write().await.get_mut(session_id) {
            set.remove(&conn_id);
        }
    }

    /// Deliver a message to every current subscriber of a session
    ///
    /// The message is serialized once. The subscriber set is snapshotted
    /// before sending and failed connections are pruned afterwards, so set
    /// mutation never races the delivery loop.
    pub async fn broadcast(&self, session_id: &str, message: &ServerMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize broadcast: {}", e);
                return;
            }
        };

        // Snapshot ids and senders under separate locks; the delivery loop
        // below never holds either one.
        let ids: Vec<Uuid> = {
            let subscribers = self.subscribers.read().await;
            let Some(set) = subscribers.get(session_id) else {
                return;
            };
            set.iter().copied().collect()
        };
        let targets: Vec<ClientConnection> = {
            let connections = self.connections.read().await;
            ids.iter()
                .filter_map(|id| connections.get(id).cloned())
                .collect()
        };

        let mut failed = Vec::new();
        for conn in targets {
            if conn.send_text(text.clone()).await.is_err() {
                failed.push(conn.id);
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            if let Some(set) = subscribers.get_mut(session_id) {
                for id in failed {
                    set.remove(&id);
                    debug!("Pruned dead subscriber {} from session {}", id, session_id);
                }
            }
        }
    }

    /// Deliver a message to every registered connection
    pub async fn broadcast_all(&self, message: &ServerMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize broadcast: {}", e);
                return;
            }
        };

        let targets: Vec<ClientConnection> =
            self.connections.read().await.values().cloned().collect();

        let mut failed = Vec::new();
        for conn in targets {
            if conn.send_text(text.clone()).await.is_err() {
                failed.push(conn.id);
            }
        }

        for id in failed {
            self.deregister(id).await;
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscriber_count(&self, session_id: &str) -> usize {
        self.subscribers
            .read()
            .await
            .get(session_id)
            .map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_message() -> ServerMessage {
        ServerMessage::UserMessage {
            content: "hi".to_string(),
            session_id: "s1".to_string(),
        }
    }

    fn connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClientConnection::new(tx), rx)
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers_and_no_one_else() {
        let fanout = Fanout::new();
        let (sub, mut sub_rx) = connection(4);
        let (other, mut other_rx) = connection(4);
        fanout.register(sub.clone()).await;
        fanout.register(other.clone()).await;
        fanout.subscribe("s1", sub.id).await;

        fanout.broadcast("s1", &test_message()).await;

        let delivered = sub_rx.recv().await.unwrap();
        assert!(delivered.contains("\"type\":\"user_message\""));
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_subscriber_is_pruned_after_one_failure() {
        let fanout = Fanout::new();
        let (alive, mut alive_rx) = connection(4);
        let (dead, dead_rx) = connection(4);
        fanout.register(alive.clone()).await;
        fanout.register(dead.clone()).await;
        fanout.subscribe("s1", alive.id).await;
        fanout.subscribe("s1", dead.id).await;
        drop(dead_rx);

        fanout.broadcast("s1", &test_message()).await;
        assert!(alive_rx.recv().await.is_some());
        assert_eq!(fanout.subscriber_count("s1").await, 1);

        // Second broadcast goes only to the survivor.
        fanout.broadcast("s1", &test_message()).await;
        assert!(alive_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn broadcast_to_session_without_subscribers_is_a_noop() {
        let fanout = Fanout::new();
        fanout.broadcast("ghost", &test_message()).await;
        assert_eq!(fanout.subscriber_count("ghost").await, 0);
    }

    #[tokio::test]
    async fn deregister_removes_connection_from_every_set() {
        let fanout = Fanout::new();
        let (conn, _rx) = connection(4);
        fanout.register(conn.clone()).await;
        fanout.subscribe("s1", conn.id).await;
        fanout.subscribe("s2", conn.id).await;

        fanout.deregister(conn.id).await;
        assert_eq!(fanout.connection_count().await, 0);
        assert_eq!(fanout.subscriber_count("s1").await, 0);
        assert_eq!(fanout.subscriber_count("s2").await, 0);
    }

    #[tokio::test]
    async fn unsubscribe_unknown_is_a_noop() {
        let fanout = Fanout::new();
        let (conn, _rx) = connection(4);
        fanout.unsubscribe("s1", conn.id).await;
        assert_eq!(fanout.subscriber_count("s1").await, 0);
    }
}

//! WebSocket handler for chat clients
//!
//! One receive loop per connection, one forward task for its outbound
//! channel, and one detached task per chat turn. Processing errors are
//! answered in-band; only close or a transport error ends the loop.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use agent_client::AgentEvent;

use super::fanout::ClientConnection;
use super::protocol::{decode_client_message, ClientMessage, ServerMessage};
use crate::state::AppState;

/// Mailbox slice sent with `inbox_update`
const INBOX_LIMIT: usize = 30;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one client connection for its whole lifetime
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel feeding this connection's outbound frames
    let (tx, mut rx) = mpsc::channel::<String>(100);
    let send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let conn = ClientConnection::new(tx);
    state.fanout.register(conn.clone()).await;
    info!("WebSocket client connected: {}", conn.id);

    conn.send_message(&ServerMessage::Connected {
        message: "Connected to email assistant".to_string(),
        available_sessions: state.registry.list_ids().await,
    })
    .await;
    send_inbox(&state, &conn).await;

    // Session this connection is currently associated with
    let mut current_session: Option<String> = None;

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_client_text(&state, &conn, &mut current_session, text.as_str()).await;
            }
            Ok(Message::Close(_)) => {
                debug!("Client {} sent close frame", conn.id);
                break;
            }
            // Axum answers pings itself; binary frames are not part of the
            // protocol.
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error from {}: {}", conn.id, e);
                break;
            }
        }
    }

    info!("WebSocket client disconnected: {}", conn.id);
    if let Some(session_id) = current_session {
        // The session stays; other subscribers and reconnects may resume it.
        state.fanout.unsubscribe(&session_id, conn.id).await;
    }
    state.fanout.deregister(conn.id).await;
    send_task.abort();
}

/// Decode one inbound frame and dispatch it
pub async fn handle_client_text(
    state: &AppState,
    conn: &ClientConnection,
    current_session: &mut Option<String>,
    text: &str,
) {
    match decode_client_message(text) {
        Ok(message) => handle_client_message(state, conn, current_session, message).await,
        Err(e) => {
            conn.send_message(&ServerMessage::Error {
                error: e.to_string(),
                details: None,
                session_id: None,
            })
            .await;
        }
    }
}

/// The per-connection protocol state machine
pub async fn handle_client_message(
    state: &AppState,
    conn: &ClientConnection,
    current_session: &mut Option<String>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Chat {
            content,
            session_id,
            new_conversation,
        } => {
            let session = state.registry.get_or_create(session_id.as_deref()).await;
            associate(state, conn, current_session, &session.id).await;

            if new_conversation {
                state.registry.end_conversation(&session.id).await;
            }
            state.registry.record_turn(&session.id).await;

            // Snapshot after the potential reset so a fresh conversation
            // really starts fresh.
            let resume = state.registry.resume_token(&session.id).await;

            state
                .fanout
                .broadcast(
                    &session.id,
                    &ServerMessage::UserMessage {
                        content: content.clone(),
                        session_id: session.id.clone(),
                    },
                )
                .await;

            // Detached turn: the receive loop keeps servicing messages while
            // the agent works, and the turn is not cancelled if this
            // connection goes away.
            let turn_state = state.clone();
            let turn_session = session.id.clone();
            tokio::spawn(async move {
                run_turn(turn_state, turn_session, content, resume).await;
            });
        }

        ClientMessage::Subscribe { session_id } => {
            // Subscribing never creates a session.
            if state.registry.contains(&session_id).await {
                associate(state, conn, current_session, &session_id).await;
                conn.send_message(&ServerMessage::Subscribed { session_id }).await;
            } else {
                conn.send_message(&ServerMessage::Error {
                    error: "Session not found".to_string(),
                    details: None,
                    session_id: Some(session_id),
                })
                .await;
            }
        }

        ClientMessage::Unsubscribe { session_id } => {
            state.fanout.unsubscribe(&session_id, conn.id).await;
            if current_session.as_deref() == Some(session_id.as_str()) {
                *current_session = None;
            }
            conn.send_message(&ServerMessage::Unsubscribed { session_id }).await;
        }

        ClientMessage::RequestInbox => {
            send_inbox(state, conn).await;
        }
    }
}

/// Move the connection onto `session_id`, leaving any previous session first
///
/// Keeps the invariant that a connection sits in at most one subscriber set.
async fn associate(
    state: &AppState,
    conn: &ClientConnection,
    current_session: &mut Option<String>,
    session_id: &str,
) {
    if current_session.as_deref() == Some(session_id) {
        return;
    }
    if let Some(previous) = current_session.take() {
        state.fanout.unsubscribe(&previous, conn.id).await;
    }
    state.fanout.subscribe(session_id, conn.id).await;
    *current_session = Some(session_id.to_string());
}

/// Drive one agent turn and broadcast its events in order
async fn run_turn(state: AppState, session_id: String, prompt: String, resume: Option<String>) {
    debug!(
        "Starting agent turn for session {} (resume: {})",
        session_id,
        resume.is_some()
    );

    let mut events = state.agent.stream_query(&prompt, resume.as_deref()).await;
    while let Some(event) = events.recv().await {
        if let AgentEvent::SystemInit { session_id: token } = &event {
            state.registry.set_resume_token(&session_id, token).await;
        }
        if let Some(message) = ServerMessage::from_agent_event(event, &session_id) {
            state.fanout.broadcast(&session_id, &message).await;
        }
    }

    debug!("Agent turn finished for session {}", session_id);
}

/// Send the current inbox slice to one connection
async fn send_inbox(state: &AppState, conn: &ClientConnection) {
    match state.mail.recent(INBOX_LIMIT).await {
        Ok(emails) => {
            conn.send_message(&ServerMessage::InboxUpdate { emails }).await;
        }
        Err(e) => warn!("Failed to load inbox: {}", e),
    }
}

/// Start the background task broadcasting inbox updates to every client
///
/// Each tick refreshes the mail store first so newly ingested mail reaches
/// connected clients.
pub fn start_inbox_watcher(state: AppState, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately; skip it, connects get their own copy.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if state.fanout.connection_count().await == 0 {
                continue;
            }
            if let Err(e) = state.mail.refresh().await {
                warn!("Inbox watcher failed to refresh mail: {}", e);
                continue;
            }
            match state.mail.recent(INBOX_LIMIT).await {
                Ok(emails) => {
                    state
                        .fanout
                        .broadcast_all(&ServerMessage::InboxUpdate { emails })
                        .await;
                }
                Err(e) => warn!("Inbox watcher failed to load mail: {}", e),
            }
        }
    });
}

//! Email agent relay server entry point
//!
//! Serves the chat WebSocket on `/ws` plus the health and mail REST
//! endpoints on one listener.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_client::{CliAgentRuntime, RuntimeConfig};
use api_server::relay::{start_inbox_watcher, ws_handler};
use api_server::routes;
use api_server::state::AppState;
use ea_core::mail::FileMailStore;

const SYSTEM_PROMPT: &str = "You are an email assistant. You can help users search \
and read their emails.\n\nAvailable tools:\n- search_inbox: Search emails using query \
syntax (from:, subject: filters)\n- read_emails: Read full content of emails by their \
IDs\n\nBe concise and helpful.";

const DEFAULT_TOOLS: &str = "mcp__email__search_inbox,mcp__email__read_emails";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=debug,agent_client=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = std::env::var("EA_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".ea-data"));
    tracing::info!("Using data directory: {:?}", data_dir);

    let mail_store = FileMailStore::new(data_dir.join("mail.json"))
        .await
        .expect("Failed to open mail store");

    let runtime_config = RuntimeConfig {
        command: std::env::var("EA_AGENT_CMD").unwrap_or_else(|_| "claude".to_string()),
        model: std::env::var("EA_AGENT_MODEL").ok(),
        allowed_tools: std::env::var("EA_AGENT_TOOLS")
            .unwrap_or_else(|_| DEFAULT_TOOLS.to_string())
            .split(',')
            .map(str::to_string)
            .collect(),
        system_prompt: Some(SYSTEM_PROMPT.to_string()),
        cwd: data_dir.clone(),
    };
    tracing::info!("Agent runtime command: {}", runtime_config.command);

    let state = AppState::new(
        Arc::new(mail_store),
        Arc::new(CliAgentRuntime::new(runtime_config)),
    );

    start_inbox_watcher(state.clone(), Duration::from_secs(5));

    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::mail::router())
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = std::env::var("EA_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8001".to_string())
        .parse()
        .expect("Invalid EA_BIND_ADDR");

    tracing::info!("Relay listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}

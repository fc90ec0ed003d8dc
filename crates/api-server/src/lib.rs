//! Email agent relay server
//!
//! WebSocket relay between browser clients and the conversational agent
//! runtime: sessions keep conversation identity stable across reconnects,
//! and streamed agent output is fanned out to every subscriber of a session.

pub mod relay;
pub mod routes;
pub mod state;

//! Relay module
//!
//! The WebSocket-facing core of the server: wire protocol, session registry,
//! subscription fanout, and the connection handler that ties them together.

pub mod fanout;
pub mod handler;
pub mod protocol;
pub mod registry;

pub use fanout::{ClientConnection, Fanout};
pub use handler::{start_inbox_watcher, ws_handler};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use registry::{Session, SessionRegistry};

//! Core library for the email agent relay
//!
//! This crate contains the pieces shared between the server and the agent
//! integration:
//! - Mail records and the repository interface backing the agent's
//!   search tools
//! - The file-backed mail store

pub mod error;
pub mod mail;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

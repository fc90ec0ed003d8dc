//! Mail module
//!
//! Mail record types, the repository interface, and the file-backed store.

mod file_store;
mod model;
mod query;
mod repository;

pub use file_store::FileMailStore;
pub use model::MailRecord;
pub use query::MailQuery;
pub use repository::{MailRepository, SEARCH_LIMIT};

//! Mail repository trait
//!
//! Defines the interface the agent's mail tools are served from.

use async_trait::async_trait;

use super::model::MailRecord;
use crate::Result;

/// Upper bound on search results
pub const SEARCH_LIMIT: usize = 30;

/// Repository interface for mailbox lookups
#[async_trait]
pub trait MailRepository: Send + Sync {
    /// Search the mailbox with the filter syntax described in
    /// [`super::MailQuery`]. Returns at most [`SEARCH_LIMIT`] records,
    /// most recent first.
    async fn search(&self, query: &str) -> Result<Vec<MailRecord>>;

    /// Fetch full records by id, most recent first. Ids with no matching
    /// record are skipped.
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<MailRecord>>;

    /// The most recent `limit` records, most recent first.
    async fn recent(&self, limit: usize) -> Result<Vec<MailRecord>>;

    /// Pick up changes from the backing store. Defaults to a no-op for
    /// repositories that are always current.
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

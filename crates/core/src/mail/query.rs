//! Search query parsing
//!
//! Queries are whitespace-separated tokens. `from:<text>` and
//! `subject:<text>` are case-insensitive substring filters combined with
//! AND. Tokens that are not a recognized filter are ignored.

use super::model::MailRecord;

/// Parsed search query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailQuery {
    pub from: Option<String>,
    pub subject: Option<String>,
}

impl MailQuery {
    /// Parse a raw query string
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::default();
        for token in raw.split_whitespace() {
            if let Some(value) = token.strip_prefix("from:") {
                if !value.is_empty() {
                    query.from = Some(value.to_lowercase());
                }
            } else if let Some(value) = token.strip_prefix("subject:") {
                if !value.is_empty() {
                    query.subject = Some(value.to_lowercase());
                }
            }
            // Anything else is not a recognized filter and is ignored.
        }
        query
    }

    /// Check whether a record satisfies every filter
    pub fn matches(&self, record: &MailRecord) -> bool {
        if let Some(from) = &self.from {
            if !record.from.to_lowercase().contains(from) {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if !record.subject.to_lowercase().contains(subject) {
                return false;
            }
        }
        true
    }

    /// True when the query carries no filters (matches everything)
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.subject.is_none()
    }
}

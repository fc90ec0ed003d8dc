//! Mail record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single message in the mailbox
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailRecord {
    /// Provider-issued message id
    pub id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: DateTime<Utc>,
    pub body: String,
    #[serde(default)]
    pub has_attachments: bool,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

fn default_folder() -> String {
    "INBOX".to_string()
}

impl MailRecord {
    /// Create a record with the given id, subject and sender
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            from: from.into(),
            to: String::new(),
            date: Utc::now(),
            body: String::new(),
            has_attachments: false,
            is_read: false,
            folder: default_folder(),
            labels: Vec::new(),
        }
    }

    /// Set the received date
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}

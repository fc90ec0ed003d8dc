//! File-based mail storage implementation
//!
//! Reads the mailbox from a JSON file on disk into an in-memory cache.
//! Ingest happens out of band; `refresh` picks up what it wrote.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::model::MailRecord;
use super::query::MailQuery;
use super::repository::{MailRepository, SEARCH_LIMIT};
use crate::Result;

/// File-based mail store using JSON
pub struct FileMailStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, MailRecord>>,
}

impl FileMailStore {
    /// Open a store backed by the given JSON file
    ///
    /// A missing file is treated as an empty mailbox.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            let records: Vec<MailRecord> = serde_json::from_str(&content)?;
            info!("Loaded {} mail records from {:?}", records.len(), path);
            records.into_iter().map(|r| (r.id.clone(), r)).collect()
        } else {
            info!("Mail file {:?} not found, starting with empty mailbox", path);
            HashMap::new()
        };

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    fn sort_recent_first(records: &mut [MailRecord]) {
        records.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

#[async_trait]
impl MailRepository for FileMailStore {
    async fn search(&self, query: &str) -> Result<Vec<MailRecord>> {
        let parsed = MailQuery::parse(query);
        let cache = self.cache.read().await;
        let mut matches: Vec<MailRecord> = cache
            .values()
            .filter(|r| parsed.matches(r))
            .cloned()
            .collect();
        Self::sort_recent_first(&mut matches);
        matches.truncate(SEARCH_LIMIT);
        Ok(matches)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<MailRecord>> {
        let cache = self.cache.read().await;
        let mut records: Vec<MailRecord> =
            ids.iter().filter_map(|id| cache.get(id).cloned()).collect();
        Self::sort_recent_first(&mut records);
        Ok(records)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<MailRecord>> {
        let cache = self.cache.read().await;
        let mut records: Vec<MailRecord> = cache.values().cloned().collect();
        Self::sort_recent_first(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    /// Reload the cache from disk, replacing its contents. A file that has
    /// gone missing leaves the cache as-is.
    async fn refresh(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<MailRecord> = serde_json::from_str(&content)?;
        debug!("Refreshed mail cache with {} records", records.len());
        let mut cache = self.cache.write().await;
        *cache = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    async fn store_with_records(records: Vec<MailRecord>) -> (tempfile::TempDir, FileMailStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mail.json");
        tokio::fs::write(&path, serde_json::to_string(&records).unwrap())
            .await
            .unwrap();
        let store = FileMailStore::new(path).await.unwrap();
        (dir, store)
    }

    fn record(id: &str, subject: &str, from: &str, age_mins: i64) -> MailRecord {
        MailRecord::new(id, subject, from).with_date(Utc::now() - Duration::minutes(age_mins))
    }

    #[tokio::test]
    async fn search_filters_and_orders_most_recent_first() {
        let (_dir, store) = store_with_records(vec![
            record("m1", "Weekly report", "alice@example.com", 30),
            record("m2", "Report draft", "alice@example.com", 10),
            record("m3", "Lunch", "bob@example.com", 5),
        ])
        .await;

        let results = store.search("from:alice subject:report").await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);
    }

    #[tokio::test]
    async fn search_caps_results_at_limit() {
        let records = (0..40i64)
            .map(|i| record(&format!("m{i}"), "bulk", "news@example.com", i))
            .collect();
        let (_dir, store) = store_with_records(records).await;

        let results = store.search("").await.unwrap();
        assert_eq!(results.len(), SEARCH_LIMIT);
        // Most recent first: m0 has the smallest age.
        assert_eq!(results[0].id, "m0");
    }

    #[tokio::test]
    async fn fetch_by_ids_skips_unknown_ids() {
        let (_dir, store) = store_with_records(vec![
            record("m1", "a", "a@example.com", 1),
            record("m2", "b", "b@example.com", 2),
        ])
        .await;

        let results = store
            .fetch_by_ids(&["m2".into(), "missing".into(), "m1".into()])
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn refresh_picks_up_disk_changes() {
        let (dir, store) = store_with_records(vec![record("m1", "a", "a@example.com", 5)]).await;
        assert_eq!(store.recent(10).await.unwrap().len(), 1);

        let updated = vec![
            record("m1", "a", "a@example.com", 5),
            record("m2", "b", "b@example.com", 1),
        ];
        tokio::fs::write(
            dir.path().join("mail.json"),
            serde_json::to_string(&updated).unwrap(),
        )
        .await
        .unwrap();

        store.refresh().await.unwrap();
        let results = store.recent(10).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);
    }

    #[tokio::test]
    async fn refresh_on_a_missing_file_keeps_the_cache() {
        let (dir, store) = store_with_records(vec![record("m1", "a", "a@example.com", 1)]).await;
        tokio::fs::remove_file(dir.path().join("mail.json"))
            .await
            .unwrap();

        store.refresh().await.unwrap();
        assert_eq!(store.recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_mailbox() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMailStore::new(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert!(store.recent(10).await.unwrap().is_empty());
    }
}

//! Offline error log
//!
//! Application errors are kept in the consumer-owned `ErrorLog` table while
//! the device is offline and forwarded to an [`ErrorSink`] once it is back
//! online. An entry is removed only after the sink accepted it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use tracing::{info, warn};

use crate::database::core::{Row, Value};
use crate::database::store::Store;

/// Timestamp layout of `ErrorLog.CreatedOn`
pub const CREATED_ON_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// One stored or pending error report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    /// Row id, `None` until stored
    pub id: Option<i64>,
    pub surveyor_id: String,
    pub message: String,
    pub created_on: String,
}

impl ErrorEntry {
    /// New entry stamped with the current local time
    pub fn now(surveyor_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::at(surveyor_id, message, Local::now())
    }

    pub fn at<Tz: TimeZone>(
        surveyor_id: impl Into<String>,
        message: impl Into<String>,
        time: DateTime<Tz>,
    ) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        ErrorEntry {
            id: None,
            surveyor_id: surveyor_id.into(),
            message: message.into(),
            created_on: time.format(CREATED_ON_FORMAT).to_string(),
        }
    }

    fn from_row(row: &Row) -> Self {
        let text = |name: &str| {
            row.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        ErrorEntry {
            id: row.get("Id").and_then(Value::as_i64),
            surveyor_id: text("SurveyorId"),
            message: text("ErrorMessage"),
            created_on: text("CreatedOn"),
        }
    }
}

/// Destination for error reports, typically a remote API
#[async_trait]
pub trait ErrorSink: Send + Sync {
    /// Deliver one entry; an error leaves the entry stored
    async fn send(&self, entry: &ErrorEntry) -> Result<()>;
}

/// Repository for the `ErrorLog` table
pub struct ErrorLogRepository<'a> {
    store: &'a Store,
}

impl<'a> ErrorLogRepository<'a> {
    /// Include this in the table schemas passed to initialization
    pub const TABLE_SCHEMA: &'static str = "CREATE TABLE IF NOT EXISTS ErrorLog (
        Id INTEGER PRIMARY KEY AUTOINCREMENT,
        SurveyorId TEXT,
        ErrorMessage TEXT,
        CreatedOn TEXT
    )";

    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Store an entry and return its id
    pub async fn record(&self, entry: &ErrorEntry) -> Result<i64> {
        let id = self
            .store
            .insert_returning_id(
                "INSERT INTO ErrorLog (SurveyorId, ErrorMessage, CreatedOn) VALUES (?, ?, ?)",
                &[
                    entry.surveyor_id.as_str().into(),
                    entry.message.as_str().into(),
                    entry.created_on.as_str().into(),
                ],
                "insertIntoErrorLog",
            )
            .await?;
        Ok(id)
    }

    /// All stored entries, oldest first
    pub async fn list(&self) -> Result<Vec<ErrorEntry>> {
        let rows = self
            .store
            .select("SELECT * FROM ErrorLog ORDER BY Id", "selectAllError")
            .await?;
        Ok(rows.iter().map(ErrorEntry::from_row).collect())
    }

    pub async fn remove(&self, id: i64) -> Result<()> {
        self.store
            .delete("DELETE FROM ErrorLog WHERE Id = ?", &[id.into()], "deleteDataFromError")
            .await?;
        Ok(())
    }

    /// Send every stored entry to `sink`, removing each one it accepts
    ///
    /// Stops at the first rejection; that entry and the ones after it stay
    /// stored. Returns the number of entries delivered.
    pub async fn flush(&self, sink: &dyn ErrorSink) -> Result<usize> {
        let mut delivered = 0;
        for entry in self.list().await? {
            sink.send(&entry).await?;
            if let Some(id) = entry.id {
                self.remove(id).await?;
            }
            delivered += 1;
        }
        if delivered > 0 {
            info!("Flushed {} stored error reports", delivered);
        }
        Ok(delivered)
    }

    /// Report a new error
    ///
    /// Online: deliver the backlog, then the new entry. Offline: store it.
    pub async fn report(
        &self,
        entry: &ErrorEntry,
        sink: &dyn ErrorSink,
        online: bool,
    ) -> Result<()> {
        if !online {
            warn!("Offline, storing error report from {}", entry.surveyor_id);
            self.record(entry).await?;
            return Ok(());
        }
        self.flush(sink).await?;
        sink.send(entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::StoreOptions;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Collects entries; rejects once `accept` deliveries were made
    struct RecordingSink {
        accept: usize,
        received: Mutex<Vec<ErrorEntry>>,
    }

    impl RecordingSink {
        fn new(accept: usize) -> Self {
            Self {
                accept,
                received: Mutex::new(Vec::new()),
            }
        }

        fn messages(&self) -> Vec<String> {
            self.received
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.message.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ErrorSink for RecordingSink {
        async fn send(&self, entry: &ErrorEntry) -> Result<()> {
            let mut received = self.received.lock().unwrap();
            if received.len() >= self.accept {
                anyhow::bail!("remote rejected report");
            }
            received.push(entry.clone());
            Ok(())
        }
    }

    async fn setup_store() -> Store {
        Store::initialize(
            &StoreOptions::in_memory("errors"),
            &[ErrorLogRepository::TABLE_SCHEMA.to_string()],
            &[],
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_created_on_format() {
        let time = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        let entry = ErrorEntry::at("S1", "boom", time);
        assert_eq!(entry.created_on, "07-03-2024 09:05:01");
        assert_eq!(entry.id, None);
    }

    #[tokio::test]
    async fn test_record_list_remove() {
        let store = setup_store().await;
        let repo = ErrorLogRepository::new(&store);

        let id = repo.record(&ErrorEntry::now("S1", "first")).await.unwrap();
        repo.record(&ErrorEntry::now("S1", "second")).await.unwrap();

        let entries = repo.list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, Some(id));
        assert_eq!(entries[0].surveyor_id, "S1");

        repo.remove(id).await.unwrap();
        assert_eq!(repo.list().await.unwrap()[0].message, "second");
    }

    #[tokio::test]
    async fn test_flush_stops_at_rejection() {
        let store = setup_store().await;
        let repo = ErrorLogRepository::new(&store);
        for msg in ["a", "b", "c"] {
            repo.record(&ErrorEntry::now("S1", msg)).await.unwrap();
        }

        let sink = RecordingSink::new(2);
        assert!(repo.flush(&sink).await.is_err());
        assert_eq!(sink.messages(), vec!["a", "b"]);

        let left = repo.list().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message, "c");
    }

    #[tokio::test]
    async fn test_report_offline_then_online() {
        let store = setup_store().await;
        let repo = ErrorLogRepository::new(&store);
        let sink = RecordingSink::new(usize::MAX);

        repo.report(&ErrorEntry::now("S1", "offline"), &sink, false)
            .await
            .unwrap();
        assert!(sink.messages().is_empty());
        assert_eq!(repo.list().await.unwrap().len(), 1);

        repo.report(&ErrorEntry::now("S1", "online"), &sink, true)
            .await
            .unwrap();
        assert_eq!(sink.messages(), vec!["offline", "online"]);
        assert!(repo.list().await.unwrap().is_empty());
    }
}

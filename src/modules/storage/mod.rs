//! Storage module for report persistence
//!
//! Defines the put/get/list contract the report store delegates to, plus
//! two durable media: PostgreSQL and an append-only JSON-lines file.

mod file_storage;
mod postgres_storage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

pub use file_storage::FileReportStorage;
pub use postgres_storage::PostgresReportStorage;

/// Flat persisted form of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ReportRecord {
    pub id: Uuid,
    pub crime_type: String,
    pub other_type: Option<String>,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub created_at: DateTime<Utc>,
}

/// Storage-level list filter
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub crime_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ReportRecord) -> bool {
        if let Some(ref crime_type) = self.crime_type {
            if &record.crime_type != crime_type {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record {0} already exists")]
    DuplicateId(Uuid),

    #[error("corrupt storage: {0}")]
    Corrupt(String),
}

/// Durable medium behind the report store.
///
/// `insert` must be durable when it returns `Ok` and must reject an id that
/// is already present with [`StorageError::DuplicateId`].
#[async_trait]
pub trait ReportStorage: Send + Sync {
    async fn insert(&self, record: &ReportRecord) -> Result<(), StorageError>;

    async fn fetch(&self, id: Uuid) -> Result<Option<ReportRecord>, StorageError>;

    /// Records matching `filter`, newest first (`created_at` then `id`, descending)
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ReportRecord>, StorageError>;

    fn backend_name(&self) -> &'static str;
}

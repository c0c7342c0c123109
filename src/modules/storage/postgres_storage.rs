//! PostgreSQL report storage
//!
//! Schema lives in `migrations/`; the primary key on `reports.id` is what
//! rejects duplicate ids.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RecordFilter, ReportRecord, ReportStorage, StorageError};

pub struct PostgresReportStorage {
    pool: PgPool,
}

impl PostgresReportStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStorage for PostgresReportStorage {
    async fn insert(&self, record: &ReportRecord) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO reports (id, crime_type, other_type, description, lat, lng, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.crime_type)
        .bind(&record.other_type)
        .bind(&record.description)
        .bind(record.lat)
        .bind(record.lng)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert report {}: {:?}", record.id, e);
            StorageError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StorageError::DuplicateId(record.id));
        }

        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<ReportRecord>, StorageError> {
        let record = sqlx::query_as::<_, ReportRecord>(
            r#"
            SELECT id, crime_type, other_type, description, lat, lng, created_at
            FROM reports
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch report {}: {:?}", id, e);
            StorageError::Database(e)
        })?;

        Ok(record)
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ReportRecord>, StorageError> {
        let limit = filter.limit.map(|l| l as i64);

        let records = sqlx::query_as::<_, ReportRecord>(
            r#"
            SELECT id, crime_type, other_type, description, lat, lng, created_at
            FROM reports
            WHERE ($1::text IS NULL OR crime_type = $1)
            AND ($2::timestamptz IS NULL OR created_at >= $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(&filter.crime_type)
        .bind(filter.since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list reports: {:?}", e);
            StorageError::Database(e)
        })?;

        Ok(records)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

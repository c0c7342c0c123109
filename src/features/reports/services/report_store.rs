use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{CreateReport, Report, ReportFilter};
use crate::modules::storage::{RecordFilter, ReportRecord, ReportStorage, StorageError};

/// Attempts at finding a free id before giving up
const MAX_ID_ATTEMPTS: usize = 3;

/// Single source of truth for reports.
///
/// Writes are serialized so id assignment and `created_at` ordering follow
/// commit order; reads go straight to the storage medium.
pub struct ReportStore {
    storage: Arc<dyn ReportStorage>,
    /// `created_at` of the most recently committed report
    last_committed: Mutex<Option<DateTime<Utc>>>,
}

impl ReportStore {
    pub async fn open(storage: Arc<dyn ReportStorage>) -> Result<Self> {
        let latest = storage
            .list(&RecordFilter {
                limit: Some(1),
                ..Default::default()
            })
            .await?
            .into_iter()
            .next()
            .map(|r| r.created_at);

        tracing::info!(
            "Report store opened on {} backend (latest report: {:?})",
            storage.backend_name(),
            latest
        );

        Ok(Self {
            storage,
            last_committed: Mutex::new(latest),
        })
    }

    /// Persist a validated report under a freshly assigned id.
    ///
    /// Returns only once the medium has durably accepted the record.
    pub async fn put(&self, data: CreateReport) -> Result<Report> {
        let mut last_committed = self.last_committed.lock().await;

        // Storage keeps microsecond precision; never step backwards in time
        let mut created_at = data.created_at.trunc_subsecs(6);
        if let Some(last) = *last_committed {
            if created_at < last {
                created_at = last;
            }
        }

        let mut data = data;
        data.created_at = created_at;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let report = Report::from_create(Uuid::now_v7(), data.clone());

            match self.storage.insert(&ReportRecord::from(&report)).await {
                Ok(()) => {
                    *last_committed = Some(created_at);
                    return Ok(report);
                }
                Err(StorageError::DuplicateId(id)) => {
                    tracing::warn!("Id collision on {} (attempt {})", id, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(format!(
            "Could not assign a unique report id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    pub async fn get(&self, id: Uuid) -> Result<Report> {
        let record = self
            .storage
            .fetch(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

        Ok(Report::try_from(record)?)
    }

    /// Reports matching `filter`, most recent first (ties by id, descending)
    pub async fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let records = self.storage.list(&RecordFilter::from(filter)).await?;

        let mut reports = records
            .into_iter()
            .map(Report::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        sort_by_recency(&mut reports);
        Ok(reports)
    }

    pub fn backend_name(&self) -> &'static str {
        self.storage.backend_name()
    }
}

pub fn sort_by_recency(reports: &mut [Report]) {
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reports::models::{CrimeType, GeoPoint};
    use crate::modules::storage::FileReportStorage;
    use crate::shared::test_helpers::{open_file_store, temp_storage_path};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create(crime_type: CrimeType, created_at: DateTime<Utc>) -> CreateReport {
        CreateReport {
            crime_type,
            other_type: None,
            description: Some("Graffiti on the wall beside the bus stop.".to_string()),
            location: GeoPoint {
                lat: 53.3479,
                lng: -6.2591,
            },
            created_at,
        }
    }

    #[tokio::test]
    async fn test_put_then_get_returns_equal_record() {
        let store = open_file_store(&temp_storage_path()).await;

        let stored = store
            .put(create(CrimeType::Vandalism, Utc::now()))
            .await
            .unwrap();

        let first = store.get(stored.id).await.unwrap();
        let second = store.get(stored.id).await.unwrap();
        assert_eq!(first, stored);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let store = open_file_store(&temp_storage_path()).await;
        let result = store.get(Uuid::now_v7()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_created_at_never_precedes_previous_commit() {
        let store = open_file_store(&temp_storage_path()).await;
        let now = Utc::now();

        let first = store.put(create(CrimeType::Theft, now)).await.unwrap();
        let second = store
            .put(create(CrimeType::Theft, now - Duration::seconds(30)))
            .await
            .unwrap();

        assert_eq!(second.created_at, first.created_at);

        let listed = store.list(&ReportFilter::default()).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|r| r.id).collect();
        let mut expected = vec![first.id, second.id];
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_stable() {
        let store = open_file_store(&temp_storage_path()).await;
        let base = Utc::now();
        for i in 0..5 {
            store
                .put(create(CrimeType::Burglary, base + Duration::seconds(i)))
                .await
                .unwrap();
        }

        let first = store.list(&ReportFilter::default()).await.unwrap();
        let second = store.list(&ReportFilter::default()).await.unwrap();
        assert_eq!(first, second);
        assert!(first
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn test_records_survive_restart() {
        let path = temp_storage_path();
        let stored = {
            let store = open_file_store(&path).await;
            store
                .put(create(CrimeType::Robbery, Utc::now()))
                .await
                .unwrap()
        };

        let reopened = open_file_store(&path).await;
        assert_eq!(reopened.get(stored.id).await.unwrap(), stored);

        // A report accepted with an older clock still sorts after the restart
        let later = reopened
            .put(create(CrimeType::Robbery, stored.created_at - Duration::hours(1)))
            .await
            .unwrap();
        assert!(later.created_at >= stored.created_at);
    }

    /// Storage that reports a collision for the first `collisions` inserts
    struct CollidingStorage {
        inner: FileReportStorage,
        collisions: AtomicUsize,
    }

    #[async_trait]
    impl ReportStorage for CollidingStorage {
        async fn insert(&self, record: &ReportRecord) -> std::result::Result<(), StorageError> {
            if self
                .collisions
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StorageError::DuplicateId(record.id));
            }
            self.inner.insert(record).await
        }

        async fn fetch(&self, id: Uuid) -> std::result::Result<Option<ReportRecord>, StorageError> {
            self.inner.fetch(id).await
        }

        async fn list(
            &self,
            filter: &RecordFilter,
        ) -> std::result::Result<Vec<ReportRecord>, StorageError> {
            self.inner.list(filter).await
        }

        fn backend_name(&self) -> &'static str {
            "colliding"
        }
    }

    async fn colliding_store(collisions: usize) -> ReportStore {
        let storage = CollidingStorage {
            inner: FileReportStorage::open(temp_storage_path()).await.unwrap(),
            collisions: AtomicUsize::new(collisions),
        };
        ReportStore::open(Arc::new(storage)).await.unwrap()
    }

    #[tokio::test]
    async fn test_id_collision_is_retried() {
        let store = colliding_store(2).await;
        let stored = store
            .put(create(CrimeType::Assault, Utc::now()))
            .await
            .unwrap();
        assert_eq!(store.get(stored.id).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_persistent_collisions_give_up() {
        let store = colliding_store(MAX_ID_ATTEMPTS).await;
        let result = store.put(create(CrimeType::Assault, Utc::now())).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(store.list(&ReportFilter::default()).await.unwrap().is_empty());
    }
}

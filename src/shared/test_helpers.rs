#[cfg(test)]
use std::path::{Path, PathBuf};

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::features::reports::models::{GeoPoint, ReportCandidate};

#[cfg(test)]
use crate::features::reports::services::{ReportService, ReportStore, SpatialIndex};

#[cfg(test)]
use crate::modules::storage::FileReportStorage;

/// Report log path in its own temp directory, removed when dropped
#[cfg(test)]
pub struct TempLogPath {
    dir: PathBuf,
    path: PathBuf,
}

#[cfg(test)]
impl Drop for TempLogPath {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[cfg(test)]
impl std::ops::Deref for TempLogPath {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
impl AsRef<Path> for TempLogPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Fresh, unique path for a JSON-lines report log under the system temp dir
#[cfg(test)]
pub fn temp_storage_path() -> TempLogPath {
    let dir = std::env::temp_dir()
        .join("crimewatch-core-tests")
        .join(uuid::Uuid::new_v4().to_string());
    let path = dir.join("reports.jsonl");
    TempLogPath { dir, path }
}

#[cfg(test)]
#[allow(dead_code)]
pub async fn open_file_store(path: &Path) -> Arc<ReportStore> {
    let storage = FileReportStorage::open(path)
        .await
        .expect("open file storage");
    Arc::new(
        ReportStore::open(Arc::new(storage))
            .await
            .expect("open report store"),
    )
}

/// Report service over a fresh file-backed store and an empty 500m grid.
///
/// The log directory is removed on return; the open handle keeps the
/// unlinked file usable for the life of the service.
#[cfg(test)]
#[allow(dead_code)]
pub async fn create_test_service() -> Arc<ReportService> {
    let path = temp_storage_path();
    let store = open_file_store(&path).await;
    let index = Arc::new(SpatialIndex::new(500.0));
    Arc::new(ReportService::new(store, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_log_dir_is_removed_on_drop() {
        let path = temp_storage_path();
        let dir = path.parent().unwrap().to_path_buf();
        drop(open_file_store(&path).await);
        assert!(dir.exists());

        drop(path);
        assert!(!dir.exists());
    }
}

#[cfg(test)]
#[allow(dead_code)]
pub fn candidate(crime_type: &str, lat: f64, lng: f64) -> ReportCandidate {
    ReportCandidate {
        crime_type: crime_type.to_string(),
        other_type: None,
        description: None,
        location: Some(GeoPoint { lat, lng }),
    }
}

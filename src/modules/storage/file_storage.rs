//! Append-only JSON-lines report storage
//!
//! One record per line. Every insert is flushed and fsynced before it is
//! acknowledged; the whole log is replayed into memory on open.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RecordFilter, ReportRecord, ReportStorage, StorageError};

struct LogState {
    file: File,
    /// Length of the log up to the last complete record
    len: u64,
    records: HashMap<Uuid, ReportRecord>,
}

pub struct FileReportStorage {
    path: PathBuf,
    state: Mutex<LogState>,
}

impl FileReportStorage {
    /// Open (or create) the log at `path` and replay it
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Raw bytes: a torn tail may end inside a multi-byte character
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let (records, valid_len) = replay(&contents)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        if valid_len < contents.len() as u64 {
            tracing::warn!(
                "Discarding torn trailing record in {} ({} bytes)",
                path.display(),
                contents.len() as u64 - valid_len
            );
            file.set_len(valid_len).await?;
            file.sync_all().await?;
        }

        tracing::info!(
            "Opened report log {} with {} records",
            path.display(),
            records.len()
        );

        Ok(Self {
            path,
            state: Mutex::new(LogState {
                file,
                len: valid_len,
                records,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse the log, returning the records and the byte length of the intact prefix.
///
/// A final line without its newline is a write that was never acknowledged
/// and is dropped; any other unreadable line is corruption.
fn replay(contents: &[u8]) -> Result<(HashMap<Uuid, ReportRecord>, u64), StorageError> {
    let mut records = HashMap::new();
    let mut offset = 0usize;

    for line in contents.split_inclusive(|b| *b == b'\n') {
        if line.last() != Some(&b'\n') {
            break;
        }

        let trimmed = line.trim_ascii();
        if !trimmed.is_empty() {
            let record: ReportRecord = serde_json::from_slice(trimmed).map_err(|e| {
                StorageError::Corrupt(format!("unreadable record at byte {}: {}", offset, e))
            })?;

            if records.contains_key(&record.id) {
                return Err(StorageError::Corrupt(format!(
                    "record {} appears more than once",
                    record.id
                )));
            }
            records.insert(record.id, record);
        }

        offset += line.len();
    }

    Ok((records, offset as u64))
}

#[async_trait]
impl ReportStorage for FileReportStorage {
    async fn insert(&self, record: &ReportRecord) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;

        if state.records.contains_key(&record.id) {
            return Err(StorageError::DuplicateId(record.id));
        }

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let write = async {
            state.file.write_all(&line).await?;
            state.file.flush().await?;
            state.file.sync_data().await
        }
        .await;

        if let Err(e) = write {
            tracing::error!("Failed to append report {}: {:?}", record.id, e);
            // Drop whatever part of the line made it to disk
            let len = state.len;
            if let Err(truncate_err) = state.file.set_len(len).await {
                tracing::error!("Failed to roll back report log: {:?}", truncate_err);
            }
            return Err(e.into());
        }

        state.len += line.len() as u64;
        state.records.insert(record.id, record.clone());

        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<ReportRecord>, StorageError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&id).cloned())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ReportRecord>, StorageError> {
        let state = self.state.lock().await;

        let mut records: Vec<ReportRecord> = state
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        drop(state);

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }

        Ok(records)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

//! Key-value storage of content records.
//!
//! `ContentStore` is a plain byte store keyed by [`RecordKey`]. The filesystem
//! implementation keeps one file per key in a flat directory; the directory
//! listing is the only index.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{MarketMindError, Result};
use crate::models::{ContentRecord, RecordKey};

/// Outcome of wiping the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub removed: usize,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Create or overwrite the record.
    async fn put(&self, key: &RecordKey, bytes: &[u8]) -> Result<()>;

    /// Fails with [`MarketMindError::NotFound`] when the record is absent.
    async fn get(&self, key: &RecordKey) -> Result<Vec<u8>>;

    /// Every record currently stored, ordered by key.
    async fn list(&self) -> Result<Vec<ContentRecord>>;

    /// Remove every record. Either all records are gone afterwards or the
    /// store is left untouched and an error is returned.
    async fn delete_all(&self) -> Result<ClearReport>;

    /// Human-readable location, for logs and health output.
    fn describe(&self) -> String;
}

// ============================================================================
// Filesystem store
// ============================================================================

#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &RecordKey) -> Result<PathBuf> {
        key.ensure_path_safe()?;
        Ok(self.root.join(key.file_name()))
    }

    /// Hidden directory inside the root that records are moved into while
    /// clearing. Its name never parses as a record.
    fn staging_path(&self) -> PathBuf {
        self.root.join(format!(".clearing-{}", Uuid::new_v4().simple()))
    }
}

async fn entry_names(dir: &Path) -> std::io::Result<Vec<OsString>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name());
    }
    Ok(names)
}

/// Move the named entries of `root` into `staging`. Entries that vanished in
/// the meantime are skipped. On failure every entry already moved is put back
/// before the error is returned.
async fn move_into_staging(
    root: &Path,
    staging: &Path,
    names: &[OsString],
) -> std::io::Result<usize> {
    let mut moved: Vec<&OsString> = Vec::with_capacity(names.len());
    for name in names {
        match fs::rename(root.join(name), staging.join(name)).await {
            Ok(()) => moved.push(name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                for name in moved.iter().rev() {
                    if let Err(undo) = fs::rename(staging.join(name), root.join(name)).await {
                        tracing::warn!(
                            entry = %name.to_string_lossy(),
                            staging = %staging.display(),
                            error = %undo,
                            "Could not restore entry after failed clear"
                        );
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(moved.len())
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, key: &RecordKey, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).await?;

        // Write beside the target and rename so readers never see a partial file.
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", key.file_name(), Uuid::new_v4().simple()));
        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(record = %key, bytes = bytes.len(), "Record written");
        Ok(())
    }

    async fn get(&self, key: &RecordKey) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MarketMindError::NotFound(key.file_name()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<ContentRecord>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(RecordKey::parse_file_name) else {
                continue;
            };
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            records.push(ContentRecord {
                content_type: key.content_type,
                content_id: key.content_id,
                size_bytes: metadata.len(),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        records.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(records)
    }

    async fn delete_all(&self) -> Result<ClearReport> {
        let names = match entry_names(&self.root).await {
            Ok(names) => names,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %self.root.display(), "Content directory absent, nothing to clear");
                return Ok(ClearReport::default());
            }
            Err(e) => return Err(e.into()),
        };
        if names.is_empty() {
            return Ok(ClearReport::default());
        }

        // The root itself stays in place: it may be a symlink, a mount point
        // or the working directory. Only its entries move.
        let staging = self.staging_path();
        fs::create_dir(&staging).await?;
        let removed = match move_into_staging(&self.root, &staging, &names).await {
            Ok(n) => n,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir(&staging).await {
                    tracing::warn!(staging = %staging.display(), error = %cleanup, "Staging directory left behind");
                }
                return Err(e.into());
            }
        };

        if let Err(e) = fs::remove_dir_all(&staging).await {
            tracing::warn!(
                staging = %staging.display(),
                error = %e,
                "Cleared records left behind in staging directory"
            );
        }

        tracing::info!(removed, dir = %self.root.display(), "Content directory cleared");
        Ok(ClearReport { removed })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    records: RwLock<BTreeMap<RecordKey, (Vec<u8>, DateTime<Utc>)>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, key: &RecordKey, bytes: &[u8]) -> Result<()> {
        self.records
            .write()
            .await
            .insert(key.clone(), (bytes.to_vec(), Utc::now()));
        Ok(())
    }

    async fn get(&self, key: &RecordKey) -> Result<Vec<u8>> {
        self.records
            .read()
            .await
            .get(key)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| MarketMindError::NotFound(key.file_name()))
    }

    async fn list(&self) -> Result<Vec<ContentRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .map(|(key, (bytes, modified))| ContentRecord {
                content_type: key.content_type,
                content_id: key.content_id.clone(),
                size_bytes: bytes.len() as u64,
                modified_at: Some(*modified),
            })
            .collect())
    }

    async fn delete_all(&self) -> Result<ClearReport> {
        let mut records = self.records.write().await;
        let removed = records.len();
        records.clear();
        Ok(ClearReport { removed })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{ContentId, ContentType};

    fn key(content_type: ContentType, id: &str) -> RecordKey {
        RecordKey::new(content_type, ContentId::new(id).unwrap())
    }

    #[tokio::test]
    async fn test_fs_put_get_uses_flat_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path().join("content"));

        let k = key(ContentType::Personas, "42");
        store.put(&k, b"{\"personas\":[]}").await.unwrap();

        let on_disk = dir.path().join("content").join("personas-42.json");
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"{\"personas\":[]}");
        assert_eq!(store.get(&k).await.unwrap(), b"{\"personas\":[]}");
    }

    #[tokio::test]
    async fn test_fs_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());

        let k = key(ContentType::Campaigns, "7");
        store.put(&k, b"first").await.unwrap();
        store.put(&k, b"second").await.unwrap();

        assert_eq!(store.get(&k).await.unwrap(), b"second");
        // No temp files left behind.
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(entry_names(dir.path()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fs_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path().join("never-created"));

        let err = store.get(&key(ContentType::GtmPlan, "1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_fs_rejects_unsafe_ids_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content");
        let store = FsContentStore::new(&root);

        let err = store
            .put(&key(ContentType::Personas, "../escape"), b"{}")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(!root.exists(), "no directory should be created");
    }

    #[tokio::test]
    async fn test_fs_list_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());

        store.put(&key(ContentType::Personas, "b"), b"{}").await.unwrap();
        store.put(&key(ContentType::Campaigns, "a"), b"[1]").await.unwrap();
        std::fs::write(dir.path().join("README.txt"), "hi").unwrap();
        std::fs::create_dir(dir.path().join("campaigns-dir.json")).unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content_type, ContentType::Campaigns);
        assert_eq!(records[0].size_bytes, 3);
        assert!(records[0].modified_at.is_some());
        assert_eq!(records[1].content_id.as_str(), "b");
    }

    #[tokio::test]
    async fn test_fs_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fs_delete_all_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content");
        let store = FsContentStore::new(&root);

        for t in ContentType::ALL {
            store.put(&key(t, "42"), b"{}").await.unwrap();
        }
        std::fs::write(root.join("stray.txt"), "x").unwrap();

        let report = store.delete_all().await.unwrap();
        assert_eq!(report.removed, 6);
        assert!(root.is_dir(), "directory itself is kept");
        assert_eq!(entry_names(&root).await.unwrap().len(), 0);

        // Staging directory is gone too.
        assert_eq!(entry_names(dir.path()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fs_delete_all_missing_or_empty_dir_succeeds() {
        let dir = tempfile::tempdir().unwrap();

        let absent = FsContentStore::new(dir.path().join("absent"));
        assert_eq!(absent.delete_all().await.unwrap().removed, 0);

        let empty_root = dir.path().join("empty");
        std::fs::create_dir(&empty_root).unwrap();
        let empty = FsContentStore::new(&empty_root);
        assert_eq!(empty.delete_all().await.unwrap().removed, 0);
        assert!(empty_root.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fs_delete_all_keeps_root_in_place() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());
        store.put(&key(ContentType::Campaigns, "1"), b"{}").await.unwrap();
        let inode = std::fs::metadata(dir.path()).unwrap().ino();

        assert_eq!(store.delete_all().await.unwrap().removed, 1);
        assert_eq!(std::fs::metadata(dir.path()).unwrap().ino(), inode);
        assert!(entry_names(dir.path()).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fs_delete_all_through_symlinked_root() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        let link = dir.path().join("content");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let store = FsContentStore::new(&link);
        store.put(&key(ContentType::Personas, "42"), b"{}").await.unwrap();

        assert_eq!(store.delete_all().await.unwrap().removed, 1);
        assert!(entry_names(&real).await.unwrap().is_empty(), "records removed from the target");
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fs_delete_all_on_file_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content");
        std::fs::write(&root, "not a directory").unwrap();

        let store = FsContentStore::new(&root);
        assert_eq!(store.delete_all().await.unwrap_err().kind(), ErrorKind::Io);
        assert_eq!(std::fs::read_to_string(&root).unwrap(), "not a directory");
    }

    #[tokio::test]
    async fn test_failed_move_restores_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());
        for t in [ContentType::Personas, ContentType::Campaigns, ContentType::GtmPlan] {
            store.put(&key(t, "42"), b"{}").await.unwrap();
        }

        // A non-empty directory in staging blocks one of the moves.
        let staging = dir.path().join(".clearing-test");
        std::fs::create_dir_all(staging.join("gtm-plan-42.json").join("blocker")).unwrap();

        let names: Vec<OsString> = ["campaigns-42.json", "personas-42.json", "gtm-plan-42.json"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert!(move_into_staging(dir.path(), &staging, &names).await.is_err());

        for t in [ContentType::Personas, ContentType::Campaigns, ContentType::GtmPlan] {
            assert_eq!(store.get(&key(t, "42")).await.unwrap(), b"{}");
        }
        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_memory_store_behaves_like_fs() {
        let store = MemoryContentStore::new();
        let k = key(ContentType::ExecutiveBrief, "9");

        assert_eq!(store.get(&k).await.unwrap_err().kind(), ErrorKind::NotFound);
        store.put(&k, b"{}").await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.delete_all().await.unwrap().removed, 1);
        assert!(store.list().await.unwrap().is_empty());
    }
}

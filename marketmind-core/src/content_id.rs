//! The active content id.
//!
//! Exactly one `ContentId` is active per client. `ContentIdStore` holds it in
//! memory and mirrors every change through an injected [`IdPersistence`]
//! backend, so a restarted client picks up where it left off.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::ContentId;

/// Durable home of the active content id.
pub trait IdPersistence: Send + Sync {
    /// Returns `None` when nothing is stored.
    fn load(&self) -> Result<Option<ContentId>>;

    fn save(&self, id: &ContentId) -> Result<()>;

    /// Removing an absent value succeeds.
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredId {
    content_id: ContentId,
}

/// Keeps the id in a small JSON file, `{"contentId": "..."}`.
#[derive(Debug, Clone)]
pub struct FileIdPersistence {
    path: PathBuf,
}

impl FileIdPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdPersistence for FileIdPersistence {
    fn load(&self) -> Result<Option<ContentId>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // An unreadable value is treated as unset so `clear` can always recover.
        match serde_json::from_str::<StoredId>(&raw) {
            Ok(stored) => Ok(Some(stored.content_id)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable content id file"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, id: &ContentId) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string(&StoredId {
            content_id: id.clone(),
        })
        .map_err(|e| crate::MarketMindError::Other(e.to_string()))?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory persistence. Clones share the same cell, which lets tests
/// simulate a restart by building a second store over a clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdPersistence {
    cell: Arc<Mutex<Option<ContentId>>>,
}

impl MemoryIdPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current persisted value, bypassing any store.
    pub fn peek(&self) -> Option<ContentId> {
        self.cell.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl IdPersistence for MemoryIdPersistence {
    fn load(&self) -> Result<Option<ContentId>> {
        Ok(self.peek())
    }

    fn save(&self, id: &ContentId) -> Result<()> {
        *self.cell.lock().unwrap_or_else(|e| e.into_inner()) = Some(id.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.cell.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Shared holder of the active content id.
pub struct ContentIdStore {
    current: RwLock<Option<ContentId>>,
    persistence: Box<dyn IdPersistence>,
}

impl ContentIdStore {
    /// Adopt whatever id the persistence backend holds, or start unset.
    pub fn initialize(persistence: impl IdPersistence + 'static) -> Result<Self> {
        let current = persistence.load()?;
        if let Some(id) = &current {
            tracing::debug!(content_id = %id, "Restored active content id");
        }
        Ok(Self {
            current: RwLock::new(current),
            persistence: Box::new(persistence),
        })
    }

    /// `None` means no content has been selected yet; callers skip their fetch.
    pub fn get(&self) -> Option<ContentId> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Persist first; the in-memory value only changes once the write landed.
    pub fn set(&self, id: ContentId) -> Result<()> {
        self.persistence.save(&id)?;
        tracing::debug!(content_id = %id, "Active content id set");
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(id);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.persistence.clear()?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unset_and_survives_reload() {
        let persistence = MemoryIdPersistence::new();
        let store = ContentIdStore::initialize(persistence.clone()).unwrap();
        assert_eq!(store.get(), None);

        store.set(ContentId::new("abc").unwrap()).unwrap();
        assert_eq!(persistence.peek().unwrap().as_str(), "abc");

        let reloaded = ContentIdStore::initialize(persistence).unwrap();
        assert_eq!(reloaded.get().unwrap().as_str(), "abc");
    }

    #[test]
    fn test_clear_removes_persisted_value() {
        let persistence = MemoryIdPersistence::new();
        let store = ContentIdStore::initialize(persistence.clone()).unwrap();
        store.set(ContentId::from(42)).unwrap();
        store.clear().unwrap();

        assert_eq!(store.get(), None);
        assert_eq!(persistence.peek(), None);
        assert_eq!(ContentIdStore::initialize(persistence).unwrap().get(), None);
    }

    #[test]
    fn test_set_replaces_previous_id() {
        let store = ContentIdStore::initialize(MemoryIdPersistence::new()).unwrap();
        store.set(ContentId::from(1)).unwrap();
        store.set(ContentId::example()).unwrap();
        assert_eq!(store.get(), Some(ContentId::example()));
    }

    #[test]
    fn test_file_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("content_id.json");

        let store = ContentIdStore::initialize(FileIdPersistence::new(&path)).unwrap();
        assert_eq!(store.get(), None);
        store.set(ContentId::new("abc").unwrap()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["contentId"], "abc");

        let reloaded = ContentIdStore::initialize(FileIdPersistence::new(&path)).unwrap();
        assert_eq!(reloaded.get().unwrap().as_str(), "abc");

        reloaded.clear().unwrap();
        assert!(!path.exists());
        // Clearing twice is fine.
        reloaded.clear().unwrap();
    }

    #[test]
    fn test_file_persistence_accepts_numeric_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content_id.json");
        std::fs::write(&path, r#"{"contentId": 17}"#).unwrap();

        let store = ContentIdStore::initialize(FileIdPersistence::new(&path)).unwrap();
        assert_eq!(store.get().unwrap().as_str(), "17");
    }

    #[test]
    fn test_unreadable_file_is_treated_as_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content_id.json");
        std::fs::write(&path, "not json").unwrap();

        let store = ContentIdStore::initialize(FileIdPersistence::new(&path)).unwrap();
        assert_eq!(store.get(), None);
        store.clear().unwrap();
        assert!(!path.exists());
    }
}

//! Load / save / clear / list facade over a [`ContentStore`].
//!
//! The repository is a dumb byte store on the way in: payloads are written
//! verbatim without validation. On the way out, `load` parses the stored bytes
//! as JSON and reports corrupt records as [`MarketMindError::MalformedPayload`].
//! It never substitutes defaults; fallbacks belong to the caller.

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::{MarketMindError, Result};
use crate::models::{ContentId, ContentRecord, ContentType, RecordKey};
use crate::store::{ClearReport, ContentStore, FsContentStore};

#[derive(Clone)]
pub struct ContentRepository {
    store: Arc<dyn ContentStore>,
}

impl ContentRepository {
    pub fn new(store: impl ContentStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(FsContentStore::new(&config.content_dir))
    }

    pub fn location(&self) -> String {
        self.store.describe()
    }

    pub async fn save(
        &self,
        content_id: &ContentId,
        content_type: ContentType,
        payload: &str,
    ) -> Result<()> {
        let key = RecordKey::new(content_type, content_id.clone());
        self.store.put(&key, payload.as_bytes()).await?;
        tracing::info!(record = %key, "Content saved");
        Ok(())
    }

    pub async fn load_raw(
        &self,
        content_id: &ContentId,
        content_type: ContentType,
    ) -> Result<Vec<u8>> {
        let key = RecordKey::new(content_type, content_id.clone());
        self.store.get(&key).await
    }

    pub async fn load(
        &self,
        content_id: &ContentId,
        content_type: ContentType,
    ) -> Result<serde_json::Value> {
        let bytes = self.load_raw(content_id, content_type).await?;
        serde_json::from_slice(&bytes).map_err(|source| MarketMindError::MalformedPayload {
            key: RecordKey::new(content_type, content_id.clone()).file_name(),
            source,
        })
    }

    /// Wipe every record regardless of type or id.
    pub async fn clear_all(&self) -> Result<ClearReport> {
        self.store.delete_all().await
    }

    /// Stored records, optionally restricted to one content type.
    pub async fn list(&self, content_type: Option<ContentType>) -> Result<Vec<ContentRecord>> {
        let records = self.store.list().await?;
        Ok(match content_type {
            Some(t) => records.into_iter().filter(|r| r.content_type == t).collect(),
            None => records,
        })
    }
}

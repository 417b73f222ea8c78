//! Generation session: ask the backend for a new content bundle and store
//! every facet of it in the repository.
//!
//! Content types are fetched and saved one at a time, in `ContentType::ALL`
//! order, so total latency is the sum of the five round trips. A failed save
//! is recorded and the session moves on; a failed backend call ends it.

use marketmind_core::models::ProductInfo;
use marketmind_core::{
    ContentId, ContentRepository, ContentType, GeneratorClient, GeneratorError, MarketMindError,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub product: ProductInfo,
    /// Wipe all stored content before starting.
    pub reset: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub content_id: ContentId,
    pub saved: Vec<ContentType>,
    pub failed: Vec<ContentType>,
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Failed to reset content store: {0}")]
    Reset(#[source] MarketMindError),

    #[error("Generator backend failed: {0}")]
    Backend(#[from] GeneratorError),
}

pub async fn run_generation(
    repository: &ContentRepository,
    client: &GeneratorClient,
    request: GenerationRequest,
) -> Result<GenerationReport, GenerationError> {
    if request.reset {
        let report = repository
            .clear_all()
            .await
            .map_err(GenerationError::Reset)?;
        tracing::info!(removed = report.removed, "Content store reset before generation");
    }

    let content_id = client.generate(&request.product).await?;

    let mut saved = Vec::new();
    let mut failed = Vec::new();

    for content_type in ContentType::ALL {
        tracing::info!(content_id = %content_id, %content_type, "Loading generated content");
        let content = client.fetch_content(&content_id, content_type).await?;

        let payload = match serde_json::to_string_pretty(&content) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(%content_type, error = %e, "Failed to serialize generated content");
                failed.push(content_type);
                continue;
            }
        };

        match repository.save(&content_id, content_type, &payload).await {
            Ok(()) => saved.push(content_type),
            Err(e) => {
                tracing::error!(content_id = %content_id, %content_type, error = %e, "Failed to save generated content");
                failed.push(content_type);
            }
        }
    }

    tracing::info!(
        content_id = %content_id,
        saved = saved.len(),
        failed = failed.len(),
        "Generation session finished"
    );

    Ok(GenerationReport {
        content_id,
        saved,
        failed,
    })
}

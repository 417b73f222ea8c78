//! Client for the external content generator backend.
//!
//! The backend starts generation jobs, serves each content type by id, and
//! answers persona chat, group chat and heatmap requests. Calls are made once;
//! a failure is returned to the caller as-is.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GeneratorConfig;
use crate::models::{
    ChatMessage, ChatRequest, ContentId, ContentType, GroupChatRequest, GroupChatResponse,
    HeatmapRequest, ProductInfo,
};

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generator API error ({code}): {message}")]
    Api { code: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    id: ContentId,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Clone)]
pub struct GeneratorClient {
    client: Client,
    base_url: String,
}

impl GeneratorClient {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        Self::with_base_url(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn with_base_url(base_url: String, timeout: Duration) -> Result<Self, GeneratorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a generation job; the backend assigns the new content id.
    pub async fn generate(&self, product: &ProductInfo) -> Result<ContentId, GeneratorError> {
        let url = format!("{}/generate", self.base_url);
        let resp: GenerateResponse = self.post_json(&url, product).await?;
        tracing::info!(content_id = %resp.id, "Generation started");
        Ok(resp.id)
    }

    pub async fn fetch_content(
        &self,
        content_id: &ContentId,
        content_type: ContentType,
    ) -> Result<serde_json::Value, GeneratorError> {
        let url = format!("{}/content/{}/{}", self.base_url, content_id, content_type);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    pub async fn chat(
        &self,
        content_id: &ContentId,
        persona_name: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, GeneratorError> {
        let url = format!("{}/chat", self.base_url);
        let request = ChatRequest {
            content_id: content_id.clone(),
            persona_name: persona_name.to_string(),
            messages,
        };
        let resp: ChatResponse = self.post_json(&url, &request).await?;
        Ok(resp.response)
    }

    pub async fn group_chat(
        &self,
        content_id: &ContentId,
        initial_message: &str,
    ) -> Result<GroupChatResponse, GeneratorError> {
        let url = format!("{}/group-chat", self.base_url);
        let request = GroupChatRequest {
            content_id: content_id.clone(),
            initial_message: initial_message.to_string(),
        };
        self.post_json(&url, &request).await
    }

    pub async fn heatmap(
        &self,
        request: &HeatmapRequest,
    ) -> Result<serde_json::Value, GeneratorError> {
        let url = format!("{}/heatmap", self.base_url);
        self.post_json(&url, request).await
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, GeneratorError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(url).json(body).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GeneratorError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %message, "Generator backend returned an error");
        return Err(GeneratorError::Api {
            code: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

// ============================================================================
// TESTS
// ============================================================================

use marketmind_core::protocol::{ContentRequest, ContentResponse};
use marketmind_core::{ContentRepository, ContentType, MarketMindError, RecordKey};

/// Dispatch one repository request. Every failure is folded into the response;
/// nothing escapes to the transport.
pub async fn handle_request(
    request: ContentRequest,
    repository: &ContentRepository,
) -> ContentResponse {
    match request {
        ContentRequest::Load {
            content_id,
            content_type,
        } => {
            let key = match RecordKey::from_params(content_id.as_deref(), content_type.as_deref()) {
                Ok(k) => k,
                Err(e) => return ContentResponse::from_error(&e),
            };
            match repository.load(&key.content_id, key.content_type).await {
                Ok(data) => ContentResponse::ok(data),
                Err(e) => {
                    tracing::error!(record = %key, error = %e, "Error loading content");
                    ContentResponse::from_error(&e)
                }
            }
        }
        ContentRequest::Save {
            content_id,
            content_type,
            content,
        } => {
            let key = match RecordKey::from_params(content_id.as_deref(), content_type.as_deref()) {
                Ok(k) => k,
                Err(e) => return ContentResponse::from_error(&e),
            };
            let payload = match content.map(payload_text) {
                Some(Ok(p)) => p,
                Some(Err(e)) => return ContentResponse::from_error(&e),
                None => {
                    return ContentResponse::from_error(&MarketMindError::MissingParameter(
                        "content",
                    ))
                }
            };
            match repository
                .save(&key.content_id, key.content_type, &payload)
                .await
            {
                Ok(()) => ContentResponse::ok(serde_json::json!({"success": true})),
                Err(e) => {
                    tracing::error!(record = %key, error = %e, "Error saving content");
                    ContentResponse::from_error(&e)
                }
            }
        }
        ContentRequest::Clear => match repository.clear_all().await {
            Ok(report) => {
                let message = if report.removed == 0 {
                    "No content to delete"
                } else {
                    "All content files deleted successfully"
                };
                ContentResponse::ok(serde_json::json!({
                    "message": message,
                    "removed": report.removed,
                }))
            }
            Err(e) => {
                tracing::error!(error = %e, "Error clearing content");
                ContentResponse::from_error(&e)
            }
        },
        ContentRequest::List { content_type } => {
            let filter = match content_type.as_deref().filter(|s| !s.is_empty()) {
                Some(raw) => match raw.parse::<ContentType>() {
                    Ok(t) => Some(t),
                    Err(e) => return ContentResponse::from_error(&e),
                },
                None => None,
            };
            match repository.list(filter).await {
                Ok(records) => ContentResponse::ok(serde_json::json!({
                    "count": records.len(),
                    "records": records,
                })),
                Err(e) => {
                    tracing::error!(error = %e, "Error listing content");
                    ContentResponse::from_error(&e)
                }
            }
        }
    }
}

fn payload_text(content: serde_json::Value) -> Result<String, MarketMindError> {
    match content {
        serde_json::Value::String(s) => Ok(s),
        other => serde_json::to_string_pretty(&other).map_err(|e| MarketMindError::Other(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketmind_core::{ErrorKind, MemoryContentStore};

    fn repo() -> ContentRepository {
        ContentRepository::new(MemoryContentStore::new())
    }

    fn save(id: &str, t: &str, content: serde_json::Value) -> ContentRequest {
        ContentRequest::Save {
            content_id: Some(id.to_string()),
            content_type: Some(t.to_string()),
            content: Some(content),
        }
    }

    fn load(id: Option<&str>, t: Option<&str>) -> ContentRequest {
        ContentRequest::Load {
            content_id: id.map(str::to_string),
            content_type: t.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_save_string_then_load() {
        let repo = repo();
        let resp = handle_request(
            save("42", "personas", serde_json::json!(r#"{"personas":[{"name":"Ana"}]}"#)),
            &repo,
        )
        .await;
        assert!(resp.is_ok());
        assert_eq!(resp.data.unwrap()["success"], true);

        let resp = handle_request(load(Some("42"), Some("personas")), &repo).await;
        assert!(resp.is_ok());
        assert_eq!(resp.data.unwrap()["personas"][0]["name"], "Ana");
    }

    #[tokio::test]
    async fn test_save_object_content_is_serialized() {
        let repo = repo();
        let resp = handle_request(
            save("7", "campaigns", serde_json::json!({"campaigns": [{"concept": "Glow"}]})),
            &repo,
        )
        .await;
        assert!(resp.is_ok());

        let stored = repo
            .load(&"7".parse().unwrap(), ContentType::Campaigns)
            .await
            .unwrap();
        assert_eq!(stored["campaigns"][0]["concept"], "Glow");
    }

    #[tokio::test]
    async fn test_missing_params_rejected() {
        let repo = repo();
        let resp = handle_request(load(None, Some("personas")), &repo).await;
        assert_eq!(resp.kind, Some(ErrorKind::MissingParameter));

        let resp = handle_request(
            ContentRequest::Save {
                content_id: Some("1".into()),
                content_type: Some("personas".into()),
                content: None,
            },
            &repo,
        )
        .await;
        assert_eq!(resp.kind, Some(ErrorKind::MissingParameter));
        assert!(repo.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_unknown_is_not_found() {
        let resp = handle_request(load(Some("1"), Some("gtm-plan")), &repo()).await;
        assert_eq!(resp.kind, Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_clear_and_list() {
        let repo = repo();
        handle_request(save("1", "campaigns", serde_json::json!("{}")), &repo).await;
        handle_request(save("1", "personas", serde_json::json!("{}")), &repo).await;

        let resp = handle_request(
            ContentRequest::List {
                content_type: Some("personas".into()),
            },
            &repo,
        )
        .await;
        assert_eq!(resp.data.unwrap()["count"], 1);

        let resp = handle_request(ContentRequest::Clear, &repo).await;
        assert_eq!(resp.data.unwrap()["removed"], 2);

        let resp = handle_request(ContentRequest::Clear, &repo).await;
        assert!(resp.is_ok());
        assert_eq!(resp.data.unwrap()["removed"], 0);
    }

    #[tokio::test]
    async fn test_list_invalid_type() {
        let resp = handle_request(
            ContentRequest::List {
                content_type: Some("memes".into()),
            },
            &repo(),
        )
        .await;
        assert_eq!(resp.kind, Some(ErrorKind::InvalidParameter));
    }
}

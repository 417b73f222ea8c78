use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, MarketMindError};

/// Repository operations, with parameters exactly as the caller supplied them.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContentRequest {
    Load {
        content_id: Option<String>,
        content_type: Option<String>,
    },
    Save {
        content_id: Option<String>,
        content_type: Option<String>,
        /// A string is stored verbatim; any other JSON value is pretty-printed first.
        content: Option<serde_json::Value>,
    },
    Clear,
    List {
        content_type: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContentResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub kind: Option<ErrorKind>,
    pub version: String,
}

impl ContentResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            kind: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            kind: Some(kind),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn from_error(e: &MarketMindError) -> Self {
        Self::err(e.kind(), e.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tagging() {
        let req: ContentRequest = serde_json::from_value(serde_json::json!({
            "action": "load",
            "content_id": "42",
            "content_type": "personas"
        }))
        .unwrap();
        assert!(matches!(
            req,
            ContentRequest::Load { content_id: Some(ref id), .. } if id == "42"
        ));

        let clear: ContentRequest =
            serde_json::from_value(serde_json::json!({"action": "clear"})).unwrap();
        assert!(matches!(clear, ContentRequest::Clear));
    }

    #[test]
    fn test_error_response_carries_kind() {
        let resp = ContentResponse::from_error(&MarketMindError::MissingParameter("contentId"));
        assert!(!resp.is_ok());
        assert_eq!(resp.kind, Some(ErrorKind::MissingParameter));
        assert_eq!(resp.error.as_deref(), Some("Missing parameter: contentId"));
    }
}

//! Wire types exchanged with the generator backend.

use serde::{Deserialize, Serialize};

use super::ContentId;

/// Placeholder used when the caller folds company details into the product text.
pub const DEFAULT_COMPANY_INFO: &str = "The company information should be in Product Info";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_info: String,
    pub company_info: String,
}

impl ProductInfo {
    pub fn new(product_info: impl Into<String>, company_info: Option<String>) -> Self {
        Self {
            product_info: product_info.into(),
            company_info: company_info.unwrap_or_else(|| DEFAULT_COMPANY_INFO.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub content_id: ContentId,
    pub persona_name: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupChatRequest {
    pub content_id: ContentId,
    pub initial_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaResponse {
    pub persona_name: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupChatResponse {
    pub responses: Vec<PersonaResponse>,
}

/// Image analysis request; the image travels inline as a data URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRequest {
    pub image_url: String,
    pub description: String,
}

impl HeatmapRequest {
    pub fn for_persona(mime_type: &str, image_base64: &str, persona: &str) -> Self {
        Self {
            image_url: format!("data:{};base64,{}", mime_type, image_base64),
            description: format!("Analyze how a {} would view this image", persona),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heatmap_request_builds_data_url() {
        let req = HeatmapRequest::for_persona("image/png", "iVBORw0KGgo=", "budget-conscious student");
        assert_eq!(req.image_url, "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(
            req.description,
            "Analyze how a budget-conscious student would view this image"
        );
    }

    #[test]
    fn test_product_info_default_company() {
        let info = ProductInfo::new("Solar backpack", None);
        assert_eq!(info.company_info, DEFAULT_COMPANY_INFO);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["product_info"], "Solar backpack");
    }
}

pub mod content;
pub mod generation;

pub use content::{ContentId, ContentRecord, ContentType, RecordKey};
pub use generation::{
    ChatMessage, ChatRequest, GroupChatRequest, GroupChatResponse, HeatmapRequest,
    PersonaResponse, ProductInfo,
};

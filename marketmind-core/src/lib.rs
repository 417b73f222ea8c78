pub mod config;
pub mod content_id;
pub mod error;
pub mod generator;
pub mod models;
pub mod protocol;
pub mod repository;
pub mod store;

pub use crate::config::MarketMindConfig;
pub use content_id::{ContentIdStore, FileIdPersistence, IdPersistence, MemoryIdPersistence};
pub use error::{ErrorKind, MarketMindError};
pub use generator::{GeneratorClient, GeneratorError};
pub use models::{ContentId, ContentRecord, ContentType, RecordKey};
pub use repository::ContentRepository;
pub use store::{ClearReport, ContentStore, FsContentStore, MemoryContentStore};

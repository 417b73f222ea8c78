use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketMindError>;

#[derive(Error, Debug)]
pub enum MarketMindError {
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Malformed payload in {key}: {source}")]
    MalformedPayload {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

/// Coarse classification carried across the request/response boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingParameter,
    InvalidParameter,
    NotFound,
    MalformedPayload,
    Io,
    Config,
    Other,
}

impl ErrorKind {
    /// Caller mistakes, rejected before any storage access.
    pub fn is_client_error(self) -> bool {
        matches!(self, ErrorKind::MissingParameter | ErrorKind::InvalidParameter)
    }
}

impl MarketMindError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketMindError::MissingParameter(_) => ErrorKind::MissingParameter,
            MarketMindError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            MarketMindError::NotFound(_) => ErrorKind::NotFound,
            MarketMindError::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            MarketMindError::Io(_) => ErrorKind::Io,
            MarketMindError::Config(_) => ErrorKind::Config,
            MarketMindError::Other(_) => ErrorKind::Other,
        }
    }

    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        MarketMindError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_errors_are_client_errors() {
        assert!(MarketMindError::MissingParameter("contentId").kind().is_client_error());
        assert!(MarketMindError::invalid("contentType", "unknown").kind().is_client_error());
        assert!(!MarketMindError::NotFound("personas-42.json".into()).kind().is_client_error());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!MarketMindError::from(io).kind().is_client_error());
    }

    #[test]
    fn test_error_kind_wire_form() {
        let json = serde_json::to_value(ErrorKind::MissingParameter).unwrap();
        assert_eq!(json, "missing_parameter");
    }
}

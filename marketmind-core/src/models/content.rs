//! Content identity and record keys.
//!
//! A generation session produces one `ContentId`; each facet of the generated
//! content is stored as a separate record keyed by `(ContentType, ContentId)`
//! in a file named `{contentType}-{contentId}.json`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{MarketMindError, Result};

/// Opaque identifier of one generation session.
///
/// The generator backend has returned both numeric and string ids over time;
/// both deserialize into the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Preset ids that can be selected without running a generation.
    pub const EXAMPLES: &'static [&'static str] = &["abc"];

    /// Accepts any non-empty string.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(MarketMindError::invalid("contentId", "must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn example() -> Self {
        Self(Self::EXAMPLES[0].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can be embedded in a file name without leaving the
    /// content directory.
    pub fn is_path_safe(&self) -> bool {
        let id = self.0.as_str();
        id != "." && id != ".." && !id.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentId {
    type Err = MarketMindError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<u64> for ContentId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        let raw = match RawId::deserialize(deserializer)? {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        };
        ContentId::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Which facet of generated content a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Campaigns,
    Personas,
    MarketResearch,
    ExecutiveBrief,
    GtmPlan,
}

impl ContentType {
    /// Every content type, in the order a generation session produces them.
    pub const ALL: [ContentType; 5] = [
        ContentType::Campaigns,
        ContentType::Personas,
        ContentType::MarketResearch,
        ContentType::ExecutiveBrief,
        ContentType::GtmPlan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Campaigns => "campaigns",
            ContentType::Personas => "personas",
            ContentType::MarketResearch => "market-research",
            ContentType::ExecutiveBrief => "executive-brief",
            ContentType::GtmPlan => "gtm-plan",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = MarketMindError;

    fn from_str(s: &str) -> Result<Self> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| MarketMindError::invalid("contentType", format!("unknown type '{}'", s)))
    }
}

/// Storage key of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub content_type: ContentType,
    pub content_id: ContentId,
}

impl RecordKey {
    pub fn new(content_type: ContentType, content_id: ContentId) -> Self {
        Self {
            content_type,
            content_id,
        }
    }

    /// Build a key from raw request parameters.
    ///
    /// Missing or empty parameters are rejected before anything else, so no
    /// storage access happens for an incomplete request.
    pub fn from_params(content_id: Option<&str>, content_type: Option<&str>) -> Result<Self> {
        let content_id = content_id
            .filter(|s| !s.is_empty())
            .ok_or(MarketMindError::MissingParameter("contentId"))?;
        let content_type = content_type
            .filter(|s| !s.is_empty())
            .ok_or(MarketMindError::MissingParameter("contentType"))?;

        let key = Self::new(content_type.parse()?, content_id.parse()?);
        key.ensure_path_safe()?;
        Ok(key)
    }

    pub fn ensure_path_safe(&self) -> Result<()> {
        if self.content_id.is_path_safe() {
            Ok(())
        } else {
            Err(MarketMindError::invalid(
                "contentId",
                format!("'{}' cannot be used as a file name", self.content_id),
            ))
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}.json", self.content_type, self.content_id)
    }

    /// Inverse of [`RecordKey::file_name`]. Returns `None` for anything that
    /// is not a record file.
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        ContentType::ALL.into_iter().find_map(|content_type| {
            let id = stem.strip_prefix(content_type.as_str())?.strip_prefix('-')?;
            let content_id = ContentId::new(id).ok()?;
            Some(Self::new(content_type, content_id))
        })
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.content_type, self.content_id)
    }
}

/// Directory listing entry for one stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub content_type: ContentType,
    pub content_id: ContentId,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

impl ContentRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.content_type, self.content_id.clone())
    }
}

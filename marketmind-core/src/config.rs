use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MarketMindConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Where content records live, relative to the working directory unless absolute.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub content_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            content_dir: "app/content".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8767,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// File holding the active content id between CLI invocations.
    pub id_file: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            id_file: ".marketmind/content_id.json".to_string(),
        }
    }
}

impl MarketMindConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = MarketMindConfig::load("does-not-exist-marketmind.toml").unwrap();
        assert_eq!(config.storage.content_dir, "app/content");
        assert_eq!(config.generator.base_url, "http://localhost:8000");
        assert_eq!(config.http_addr(), "127.0.0.1:8767");
    }

    #[test]
    fn test_partial_file_overrides_sections() {
        let config = MarketMindConfig::from_toml_str(
            r#"
            [storage]
            content_dir = "/var/lib/marketmind/content"

            [http]
            host = "0.0.0.0"
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.content_dir, "/var/lib/marketmind/content");
        assert_eq!(config.http_addr(), "0.0.0.0:9000");
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.client.id_file, ".marketmind/content_id.json");
    }
}

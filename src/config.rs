use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-generation index settings, fixed when the physical index is created
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 0,
        }
    }
}

/// Tokenizer configuration for full-text analyzers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
    pub min_token_length: usize,
    pub max_token_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            remove_stopwords: false,
            stem: false,
            min_token_length: 1,
            max_token_length: 255,
        }
    }
}

impl TokenizerConfig {
    /// Configuration behind the `english` analyzer
    pub fn english() -> Self {
        Self {
            remove_stopwords: true,
            stem: true,
            min_token_length: 2,
            ..Self::default()
        }
    }
}

/// Storage engine endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub user_name: String,
    pub password: String,
}

/// Connection descriptor handed to the document store
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    pub endpoint: Endpoint,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    /// Logical collection name (usually an alias)
    pub collection: String,
    pub request_timeout_ms: u64,
    pub default_page_size: usize,
    /// Matches fetched by the first round trip of a URL lookup; larger
    /// result sets take a second one
    pub lookup_batch_size: usize,
    #[serde(default)]
    pub index_settings: IndexSettings,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            credentials: None,
            collection: "pages".to_string(),
            request_timeout_ms: 30_000,
            default_page_size: 200,
            lookup_batch_size: 10,
            index_settings: IndexSettings::default(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration for the given logical collection
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.endpoint = Endpoint {
            host: host.into(),
            port,
        };
        self
    }

    pub fn with_credentials(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            user_name: user_name.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_lookup_batch_size(mut self, size: usize) -> Self {
        self.lookup_batch_size = size;
        self
    }

    pub fn with_index_settings(mut self, settings: IndexSettings) -> Self {
        self.index_settings = settings;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let settings = IndexSettings::default();
        assert_eq!(settings.number_of_shards, 1);
        assert_eq!(settings.number_of_replicas, 0);

        let config = StoreConfig::default();
        assert_eq!(config.collection, "pages");
        assert_eq!(config.default_page_size, 200);
        assert_eq!(config.endpoint.port, 9200);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_english_tokenizer_config() {
        let english = TokenizerConfig::english();
        assert!(english.stem);
        assert!(english.remove_stopwords);
        assert!(english.lowercase);
    }

    #[test]
    fn test_store_config_builder() {
        let config = StoreConfig::new("search")
            .with_endpoint("es.internal", 9243)
            .with_credentials("elastic", "secret")
            .with_request_timeout(Duration::from_secs(5))
            .with_index_settings(IndexSettings {
                number_of_shards: 3,
                number_of_replicas: 1,
            });

        assert_eq!(config.collection, "search");
        assert_eq!(config.endpoint.host, "es.internal");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.index_settings.number_of_shards, 3);
        assert_eq!(
            config.credentials.as_ref().map(|c| c.user_name.as_str()),
            Some("elastic")
        );
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let json = r#"{
            "endpoint": {"host": "localhost", "port": 9200},
            "collection": "wiki",
            "request_timeout_ms": 1000,
            "default_page_size": 50,
            "lookup_batch_size": 10
        }"#;
        let config: StoreConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.collection, "wiki");
        assert_eq!(config.index_settings, IndexSettings::default());
    }
}

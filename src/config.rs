use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Two settings that must agree with each other do not.
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Runtime configuration for the retrieval core.
///
/// Loaded once near process start and handed by reference into the
/// [`crate::processing::IngestionPipeline`] and
/// [`crate::processing::RetrievalEngine`] constructors. There is no global
/// configuration cache; hosts own the value.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance backing the vector index.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Name of the Qdrant table (collection) holding child vectors.
    pub table_name: String,
    /// Filesystem path of the SQLite database holding parent sections.
    pub parent_db_path: String,
    /// Base URL of the embedding endpoint (OpenAI-compatible).
    pub embedding_url: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors, fixed at table creation.
    pub embedding_dimension: usize,
    /// Optional base URL of the reranking endpoint.
    pub rerank_url: Option<String>,
    /// Optional reranker model identifier.
    pub rerank_model: Option<String>,
    /// Deepest heading level treated as a parent-section boundary.
    pub max_header_level: usize,
    /// Character length of each child window.
    pub window_size: usize,
    /// Character overlap between adjacent child windows.
    pub window_overlap: usize,
    /// Minimum spacing between consecutive embedding calls during ingestion.
    pub embed_interval_ms: u64,
}

const DEFAULT_TABLE_NAME: &str = "bright_knowledge";
const DEFAULT_PARENT_DB_PATH: &str = "data/brightbrain.db";
const DEFAULT_MAX_HEADER_LEVEL: usize = 3;
const DEFAULT_WINDOW_SIZE: usize = 500;
const DEFAULT_WINDOW_OVERLAP: usize = 100;
const DEFAULT_EMBED_INTERVAL_MS: u64 = 100;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            table_name: load_env_optional("KNOWLEDGE_TABLE_NAME")
                .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            parent_db_path: load_env_optional("PARENT_DB_PATH")
                .unwrap_or_else(|| DEFAULT_PARENT_DB_PATH.to_string()),
            embedding_url: load_env("EMBEDDING_URL")?,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: parse_env(
                "EMBEDDING_DIMENSION",
                load_env("EMBEDDING_DIMENSION")?,
            )?,
            rerank_url: load_env_optional("RERANK_URL"),
            rerank_model: load_env_optional("RERANK_MODEL"),
            max_header_level: parse_env_or("MAX_HEADER_LEVEL", DEFAULT_MAX_HEADER_LEVEL)?,
            window_size: parse_env_or("WINDOW_SIZE", DEFAULT_WINDOW_SIZE)?,
            window_overlap: parse_env_or("WINDOW_OVERLAP", DEFAULT_WINDOW_OVERLAP)?,
            embed_interval_ms: parse_env_or("EMBED_INTERVAL_MS", DEFAULT_EMBED_INTERVAL_MS)?,
        };

        if config.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()));
        }
        if config.window_size == 0 {
            return Err(ConfigError::InvalidValue("WINDOW_SIZE".to_string()));
        }
        if config.window_overlap >= config.window_size {
            return Err(ConfigError::Inconsistent(
                "WINDOW_OVERLAP must be smaller than WINDOW_SIZE".to_string(),
            ));
        }
        if config.max_header_level == 0 {
            return Err(ConfigError::InvalidValue("MAX_HEADER_LEVEL".to_string()));
        }

        Ok(config)
    }
}

/// Load a `.env` file when present, then read configuration from the environment.
pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        table = %config.table_name,
        parent_db = %config.parent_db_path,
        embedding_model = %config.embedding_model,
        dimension = config.embedding_dimension,
        "Loaded configuration"
    );
    Ok(config)
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => parse_env(key, value),
        None => Ok(default),
    }
}

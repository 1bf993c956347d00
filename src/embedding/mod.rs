//! Embedding capability: the [`Embedder`] trait and an HTTP adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid embedding endpoint URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider returned no vector for the supplied input.
    #[error("Embedding provider returned no vectors")]
    EmptyResponse,
    /// Returned vector dimension does not match the configured table.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension fixed at table creation.
        expected: usize,
        /// Dimension actually produced by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
///
/// Callers pass input through [`sanitize_input`] first; embedding models
/// treat newlines as noise, so the contract is a single-line string.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Produce a fixed-dimension vector for the supplied text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Collapse newlines to spaces before submission to an embedding model.
pub fn sanitize_input(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// Embedding client for OpenAI-compatible `/embeddings` endpoints.
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl HttpEmbeddingClient {
    /// Construct a client for the given endpoint, model, and expected dimension.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        dimension: usize,
    ) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .user_agent("brightbrain/0.1")
            .build()
            .map_err(EmbedError::Http)?;
        let parsed =
            reqwest::Url::parse(base_url).map_err(|err| EmbedError::InvalidUrl(err.to_string()))?;

        Ok(Self {
            client,
            base_url: parsed.to_string().trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&json!({
                "model": self.model,
                "input": [text],
            }));
        if let Some(api_key) = self.api_key.as_deref().filter(|key| !key.is_empty()) {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = EmbedError::UnexpectedStatus { status, body };
            tracing::error!(model = %self.model, error = %error, "Embedding request failed");
            return Err(error);
        }

        let payload: EmbeddingsResponse = response.json().await?;
        let vector = payload
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or(EmbedError::EmptyResponse)?;

        if vector.len() != self.dimension {
            return Err(EmbedError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[test]
    fn sanitize_input_collapses_newlines() {
        assert_eq!(sanitize_input("a\nb\r\nc"), "a b  c");
        assert_eq!(sanitize_input("plain"), "plain");
    }

    #[tokio::test]
    async fn embed_parses_vector_and_checks_dimension() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(serde_json::json!({
                    "data": [{ "embedding": [0.1, 0.2, 0.3] }]
                }));
            })
            .await;

        let client =
            HttpEmbeddingClient::new(&server.base_url(), "bge-m3", None, 3).expect("client");
        let vector = client.embed("hello").await.expect("embedding");
        mock.assert();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);

        let strict =
            HttpEmbeddingClient::new(&server.base_url(), "bge-m3", None, 4).expect("client");
        let error = strict.embed("hello").await.unwrap_err();
        assert!(matches!(
            error,
            EmbedError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn embed_surfaces_unexpected_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(503).body("overloaded");
            })
            .await;

        let client =
            HttpEmbeddingClient::new(&server.base_url(), "bge-m3", None, 3).expect("client");
        let error = client.embed("hello").await.unwrap_err();
        assert!(matches!(error, EmbedError::UnexpectedStatus { .. }));
    }
}

//! Reranking capability: pairwise (query, document) scoring for deep search.
//!
//! Rerankers return the cross-encoder's raw logit; the retrieval engine
//! normalizes it with [`sigmoid`] to obtain a 0..1 relevance probability.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by reranking providers.
#[derive(Debug, Error)]
pub enum RerankError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid rerank endpoint URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("Rerank request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected rerank response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider returned no score for the supplied pair.
    #[error("Rerank provider returned no scores")]
    EmptyResponse,
}

/// Interface implemented by reranking backends.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score one (query, document) pair, returning the model's raw logit.
    async fn score(&self, query: &str, document: &str) -> Result<f32, RerankError>;
}

/// Map a raw logit onto the 0..1 range.
pub fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

/// Rerank client for TEI/Jina-style `/rerank` endpoints.
pub struct HttpRerankClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankItem>,
}

#[derive(Deserialize)]
struct RerankItem {
    score: f32,
}

impl HttpRerankClient {
    /// Construct a client for the given endpoint and model.
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> Result<Self, RerankError> {
        let client = Client::builder()
            .user_agent("brightbrain/0.1")
            .build()
            .map_err(RerankError::Http)?;
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|err| RerankError::InvalidUrl(err.to_string()))?;

        Ok(Self {
            client,
            base_url: parsed.to_string().trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Reranker for HttpRerankClient {
    async fn score(&self, query: &str, document: &str) -> Result<f32, RerankError> {
        let mut request = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .json(&json!({
                "model": self.model,
                "query": query,
                "documents": [document],
                "raw_scores": true,
            }));
        if let Some(api_key) = self.api_key.as_deref().filter(|key| !key.is_empty()) {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = RerankError::UnexpectedStatus { status, body };
            tracing::error!(model = %self.model, error = %error, "Rerank request failed");
            return Err(error);
        }

        let payload: RerankResponse = response.json().await?;
        payload
            .results
            .into_iter()
            .next()
            .map(|item| item.score)
            .ok_or(RerankError::EmptyResponse)
    }
}

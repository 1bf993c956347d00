//! HTTP client implementing the hybrid vector index on Qdrant.

use reqwest::{Client, Method, StatusCode};
use serde_json::json;

use crate::qdrant::payload::{
    build_child_payload, current_timestamp_rfc3339, generate_point_id, row_from_point,
};
use crate::qdrant::types::{
    ChildRecord, IndexError, QueryResponse, QueryResponseResult, ScoredRow,
};

/// Payload field holding the searchable child text.
const TEXT_FIELD: &str = "text";

/// Hybrid vector+full-text table for one corpus, backed by a Qdrant collection.
///
/// The handle is opened once at process start and shared by the ingestion and
/// retrieval paths. Callers serialize writes per knowledge source; the index
/// itself performs no in-process locking.
pub struct QdrantIndex {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) table: String,
    pub(crate) vector_size: usize,
}

impl QdrantIndex {
    /// Construct a client for the table named `table` with vectors of `vector_size` floats.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        table: &str,
        vector_size: usize,
    ) -> Result<Self, IndexError> {
        let client = Client::builder().user_agent("brightbrain/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(IndexError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            table,
            vector_size,
            has_api_key = api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            table: table.to_string(),
            vector_size,
        })
    }

    /// Idempotent create-if-absent / open-if-present for the child-vector table.
    ///
    /// Creating the table also installs the payload indexes and the full-text
    /// index on the searchable text field, so a freshly created table is
    /// immediately queryable.
    pub async fn ensure_table(&self) -> Result<(), IndexError> {
        if !self.table_exists().await? {
            tracing::debug!(table = %self.table, vector_size = self.vector_size, "Creating table");
            let body = json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine"
                }
            });
            let response = self
                .request(Method::PUT, &format!("collections/{}", self.table))?
                .json(&body)
                .send()
                .await?;
            self.ensure_success(response, || {
                tracing::debug!(table = %self.table, "Table created");
            })
            .await?;
        }

        self.ensure_payload_indexes().await?;
        self.create_full_text_index(TEXT_FIELD).await
    }

    /// Append child rows to the table.
    ///
    /// Callers follow a batch with [`Self::create_full_text_index`] when a
    /// query issued immediately afterwards must see the new rows.
    pub async fn add(&self, records: Vec<ChildRecord>) -> Result<usize, IndexError> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = current_timestamp_rfc3339();
        let serialized: Vec<_> = records
            .iter()
            .map(|record| {
                json!({
                    "id": generate_point_id(),
                    "vector": record.vector,
                    "payload": build_child_payload(record, &now),
                })
            })
            .collect();

        let count = serialized.len();
        let response = self
            .request(Method::PUT, &format!("collections/{}/points", self.table))?
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(table = %self.table, points = count, "Child rows indexed");
        })
        .await?;

        Ok(count)
    }

    /// Run one hybrid query blending dense similarity and full-text matching.
    ///
    /// Two prefetch branches — plain dense search, and dense search restricted
    /// to rows whose text matches the query words — are fused with reciprocal
    /// rank fusion, so rows matching on both signals rank first. Rows come
    /// back ordered by the fused relevance score.
    pub async fn hybrid_query(
        &self,
        vector: Vec<f32>,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<ScoredRow>, IndexError> {
        let text_filter = json!({
            "must": [
                {
                    "key": TEXT_FIELD,
                    "match": { "text": query_text }
                }
            ]
        });
        let body = json!({
            "prefetch": [
                {
                    "query": vector,
                    "limit": limit,
                },
                {
                    "query": vector,
                    "filter": text_filter,
                    "limit": limit,
                }
            ],
            "query": { "fusion": "rrf" },
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.table),
            )?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = IndexError::UnexpectedStatus { status, body };
            tracing::error!(table = %self.table, error = %error, "Hybrid query failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };

        Ok(points.into_iter().map(row_from_point).collect())
    }

    /// Remove every row owned by the given knowledge source.
    pub async fn delete_by_source(&self, source_id: &str) -> Result<(), IndexError> {
        let body = json!({
            "filter": {
                "must": [
                    {
                        "key": "source_id",
                        "match": { "value": source_id }
                    }
                ]
            }
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/delete", self.table),
            )?
            .query(&[("wait", true)])
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(table = %self.table, source_id, "Source rows deleted");
        })
        .await
    }

    /// Ensure the full-text index on `field` covers all rows.
    ///
    /// Qdrant maintains field indexes incrementally, so re-issuing the schema
    /// after a batch is a cheap refresh; an already-present index is not an
    /// error.
    pub async fn create_full_text_index(&self, field: &str) -> Result<(), IndexError> {
        let body = json!({
            "field_name": field,
            "field_schema": {
                "type": "text",
                "tokenizer": "word",
                "lowercase": true
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}/index", self.table))?
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::CONFLICT {
            tracing::debug!(table = %self.table, field, "Full-text index ensured");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            let error = IndexError::UnexpectedStatus { status, body };
            tracing::error!(table = %self.table, field, error = %error, "Failed to ensure full-text index");
            Err(error)
        }
    }

    /// Ensure keyword/datetime payload indexes exist for the filterable fields.
    async fn ensure_payload_indexes(&self) -> Result<(), IndexError> {
        let fields: [(&str, &str); 4] = [
            ("parent_id", "keyword"),
            ("source_id", "keyword"),
            ("source_name", "keyword"),
            ("created_at", "datetime"),
        ];

        for (field, schema) in fields {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{}/index", self.table))?
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() || status == StatusCode::CONFLICT {
                tracing::debug!(table = %self.table, field, schema, "Payload index ensured");
            } else {
                let body = response.text().await.unwrap_or_default();
                let error = IndexError::UnexpectedStatus { status, body };
                tracing::warn!(table = %self.table, field, schema, error = %error, "Failed to ensure payload index");
            }
        }

        Ok(())
    }

    async fn table_exists(&self) -> Result<bool, IndexError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.table))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = IndexError::UnexpectedStatus { status, body };
                tracing::error!(table = %self.table, error = %error, "Table existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, IndexError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), IndexError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = IndexError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, Method::PUT, MockServer};

    fn index_for(server: &MockServer) -> QdrantIndex {
        QdrantIndex::new(&server.base_url(), None, "demo", 4).expect("index")
    }

    #[tokio::test]
    async fn hybrid_query_parses_rows_in_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/query")
                    .json_body_partial(r#"{ "query": { "fusion": "rrf" } }"#);
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            {
                                "id": "child-1",
                                "score": 0.9,
                                "payload": {
                                    "source": "file:///guide.md",
                                    "source_name": "guide.md",
                                    "text": "Setup\nInstall deps.",
                                    "parent_id": "p1",
                                    "source_id": "s1",
                                    "created_at": "2025-01-01T00:00:00Z"
                                }
                            },
                            {
                                "id": "child-2",
                                "score": 0.4,
                                "payload": {
                                    "source": "file:///guide.md",
                                    "source_name": "guide.md",
                                    "text": "Intro\nWelcome.",
                                    "parent_id": "p2",
                                    "source_id": "s1",
                                    "created_at": "2025-01-01T00:00:00Z"
                                }
                            }
                        ]
                    }
                }));
            })
            .await;

        let index = index_for(&server);
        let rows = index
            .hybrid_query(vec![0.1, 0.2, 0.3, 0.4], "setup", 8)
            .await
            .expect("query");

        mock.assert();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].parent_id, "p1");
        assert!(rows[0].score > rows[1].score);
        assert_eq!(rows[1].text, "Intro\nWelcome.");
        assert_eq!(rows[1].source_name, "guide.md");
    }

    #[tokio::test]
    async fn ensure_table_creates_when_missing() {
        let server = MockServer::start_async().await;
        let missing = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/demo");
                then.status(404);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/demo")
                    .json_body_partial(r#"{ "vectors": { "size": 4, "distance": "Cosine" } }"#);
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        let field_index = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/demo/index");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;

        let index = index_for(&server);
        index.ensure_table().await.expect("ensure");

        missing.assert();
        create.assert();
        // Four payload indexes plus the full-text index on the text field.
        field_index.assert_hits(5);
    }

    #[tokio::test]
    async fn ensure_table_opens_existing_without_create() {
        let server = MockServer::start_async().await;
        let present = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/demo");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/demo/index");
                then.status(409).body("already exists");
            })
            .await;

        let index = index_for(&server);
        index.ensure_table().await.expect("ensure");
        present.assert();
    }

    #[tokio::test]
    async fn delete_by_source_filters_on_source_id() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/delete")
                    .json_body_partial(
                        r#"{ "filter": { "must": [{ "key": "source_id", "match": { "value": "s1" } }] } }"#,
                    );
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;

        let index = index_for(&server);
        index.delete_by_source("s1").await.expect("delete");
        mock.assert();
    }

    #[tokio::test]
    async fn add_skips_request_for_empty_batch() {
        let server = MockServer::start_async().await;
        let index = index_for(&server);
        let count = index.add(Vec::new()).await.expect("add");
        assert_eq!(count, 0);
    }
}

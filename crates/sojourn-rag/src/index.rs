//! Remote passage index.
//!
//! [`PassageIndex`] is the retrieval seam used by the answer engine.
//! [`LlamaCloudIndex`] implements it against the LlamaCloud pipeline API:
//! the pipeline id is resolved from project and index name on first use,
//! once per process, and reused for every query afterwards.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sojourn_core::config::RetrievalConfig;
use sojourn_core::types::{Passage, SourceId};
use tokio::sync::OnceCell;

use crate::error::RagError;

/// A similarity index over curated documents.
#[async_trait]
pub trait PassageIndex: Send + Sync {
    /// Return up to `top_k` passages for `text`, best match first.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Passage>, RagError>;
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct PipelineSummary {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_nodes: Vec<ScoredNode>,
}

#[derive(Debug, Deserialize)]
struct ScoredNode {
    node: TextNode,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
    #[serde(default)]
    extra_info: Option<Map<String, Value>>,
}

impl TextNode {
    fn into_passage(self) -> Option<Passage> {
        let text = self.text.unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let metadata = self
            .metadata
            .filter(|m| !m.is_empty())
            .or(self.extra_info);
        Some(Passage::new(text, SourceId::from_metadata(metadata.as_ref())))
    }
}

// =============================================================================
// LlamaCloudIndex
// =============================================================================

/// [`PassageIndex`] backed by a LlamaCloud pipeline.
pub struct LlamaCloudIndex {
    client: Client,
    base_url: String,
    api_key: String,
    organization_id: String,
    project_name: String,
    index_name: String,
    pipeline_id: OnceCell<String>,
}

impl LlamaCloudIndex {
    pub fn new(
        config: &RetrievalConfig,
        api_key: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Result<Self, RagError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RagError::Config("retrieval base_url is empty".to_string()));
        }
        if config.index_name.trim().is_empty() {
            return Err(RagError::Config("retrieval index_name is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            organization_id: organization_id.into(),
            project_name: config.project_name.clone(),
            index_name: config.index_name.clone(),
            pipeline_id: OnceCell::new(),
        })
    }

    /// Pipeline id, resolved on first call. Concurrent first calls share
    /// one lookup; a failed lookup is retried by the next call.
    pub async fn pipeline_id(&self) -> Result<&str, RagError> {
        let id = self
            .pipeline_id
            .get_or_try_init(|| self.resolve_pipeline_id())
            .await?;
        Ok(id.as_str())
    }

    async fn resolve_pipeline_id(&self) -> Result<String, RagError> {
        let url = format!("{}/api/v1/pipelines", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[
                ("project_name", self.project_name.as_str()),
                ("pipeline_name", self.index_name.as_str()),
                ("organization_id", self.organization_id.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let pipelines: Vec<PipelineSummary> = response
            .json()
            .await
            .map_err(|e| RagError::Decode(format!("invalid pipeline list: {}", e)))?;

        let id = pipelines.into_iter().next().map(|p| p.id).ok_or_else(|| {
            RagError::Retrieval(format!(
                "index '{}' not found in project '{}'",
                self.index_name, self.project_name
            ))
        })?;

        tracing::info!(index = %self.index_name, pipeline_id = %id, "Resolved document index");
        Ok(id)
    }
}

#[async_trait]
impl PassageIndex for LlamaCloudIndex {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Passage>, RagError> {
        let pipeline_id = self.pipeline_id().await?;
        let url = format!("{}/api/v1/pipelines/{}/retrieve", self.base_url, pipeline_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "query": text,
                "dense_similarity_top_k": top_k,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RetrieveResponse = response
            .json()
            .await
            .map_err(|e| RagError::Decode(format!("invalid retrieval response: {}", e)))?;

        let passages: Vec<Passage> = parsed
            .retrieval_nodes
            .into_iter()
            .filter_map(|n| n.node.into_passage())
            .take(top_k)
            .collect();

        tracing::debug!(count = passages.len(), "Retrieved passages");
        Ok(passages)
    }
}

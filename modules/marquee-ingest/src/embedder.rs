use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use marquee_common::TextEmbedder;

/// Texts per request.
const EMBED_BATCH_SIZE: usize = 64;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Client for any OpenAI-compatible `/embeddings` endpoint (OpenAI itself,
/// a local text-embeddings server, Ollama, ...).
pub struct HttpEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}"))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        debug!(model = %self.model, texts = texts.len(), "Embedding request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Embedding API error ({status}): {error_text}"));
        }

        let body: EmbeddingResponse = response.json().await?;
        into_ordered(body, texts.len())
    }
}

/// Restore input order from the response's `index` field and check that
/// exactly one vector came back per text.
fn into_ordered(mut body: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if body.data.len() != expected {
        return Err(anyhow!(
            "Embedding API returned {} vectors for {expected} texts",
            body.data.len()
        ));
    }
    body.data.sort_by_key(|d| d.index);
    Ok(body.data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait::async_trait]
impl TextEmbedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding in response"))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            out.extend(self.request(chunk).await?);
        }
        Ok(out)
    }
}

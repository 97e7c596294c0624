use crate::errors::ConfigError;
use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> String;
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

pub struct OpenAiEmbedder {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            base_url: EMBEDDINGS_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> String {
        format!("openai:{}", self.model)
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let body = json!({ "model": self.model, "input": text });
        let resp = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("embeddings API error {}: {}", status, error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        let arr = json
            .pointer("/data/0/embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow::anyhow!("embeddings API response missing vector"))?;

        let mut v = Vec::with_capacity(arr.len());
        for x in arr {
            let f = x
                .as_f64()
                .ok_or_else(|| anyhow::anyhow!("embeddings API returned non-numeric value"))?;
            v.push(f as f32);
        }
        Ok(v)
    }
}

/// Deterministic hashed bag-of-words embedder for tests and offline runs.
/// Texts sharing vocabulary land near each other, which is exactly the
/// property the retriever's ranking tests need.
pub struct FakeEmbedder {
    pub dims: usize,
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self { dims: 256 }
    }
}

impl FakeEmbedder {
    fn bucket(&self, token: &str) -> usize {
        let mut h = Sha256::new();
        h.update(token.as_bytes());
        let digest = h.finalize();
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(buf) % self.dims as u64) as usize
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_id(&self) -> String {
        format!("fake:bow-{}", self.dims)
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            v[self.bucket(&token.to_lowercase())] += 1.0;
        }
        let norm = v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        if norm == 0.0 {
            // Empty text still gets a valid unit vector.
            v[0] = 1.0;
            return Ok(v);
        }
        for x in &mut v {
            *x = (*x as f64 / norm) as f32;
        }
        Ok(v)
    }
}

/// Builds an embedder from a provider name, mirroring `build_client`.
/// `none` is accepted so exec-mode evaluation can skip embeddings entirely.
pub fn build_embedder(
    provider: &str,
    model: &str,
    api_key: Option<String>,
) -> Result<Option<Arc<dyn Embedder>>, ConfigError> {
    match provider {
        "none" => Ok(None),
        "openai" => {
            let key = api_key
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| {
                    ConfigError("embedder 'openai' requires OPENAI_API_KEY".into())
                })?;
            Ok(Some(Arc::new(OpenAiEmbedder::new(model.to_string(), key))))
        }
        "fake" => Ok(Some(Arc::new(FakeEmbedder::default()))),
        other => Err(ConfigError(format!(
            "unknown embedder '{}' (expected none|openai|fake)",
            other
        ))),
    }
}

use crate::model::{ChatMessage, LlmResponse};
use async_trait::async_trait;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<LlmResponse>;
    fn provider_name(&self) -> &'static str;
}

pub mod fake;
pub mod openai;

use crate::errors::ConfigError;
use std::sync::Arc;

/// Builds a client from a provider name. Unknown names and missing
/// credentials are configuration errors, caught before any item runs.
pub fn build_client(
    provider: &str,
    model: &str,
    api_key: Option<String>,
) -> Result<Arc<dyn LlmClient>, ConfigError> {
    match provider {
        "openai" => {
            let key = api_key
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| {
                    ConfigError("provider 'openai' requires OPENAI_API_KEY".into())
                })?;
            Ok(Arc::new(openai::OpenAiClient::new(model.to_string(), key)))
        }
        "fake" => Ok(Arc::new(fake::FakeLlm::default())),
        other => Err(ConfigError(format!(
            "unknown llm provider '{}' (expected openai|fake)",
            other
        ))),
    }
}

use super::LlmClient;
use crate::model::{ChatMessage, LlmResponse};
use async_trait::async_trait;

/// Deterministic offline client for tests and dry runs. Echoes a canned SQL
/// statement, or the content of a `-- reply:` directive in the user message
/// when present, so tests can script exact model output.
#[derive(Default)]
pub struct FakeLlm;

#[async_trait]
impl LlmClient for FakeLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<LlmResponse> {
        let user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let text = user
            .lines()
            .find_map(|l| l.split_once("-- reply:"))
            .map(|(_, reply)| reply.trim().to_string())
            .unwrap_or_else(|| "SELECT 1".to_string());

        Ok(LlmResponse {
            text,
            provider: "fake".to_string(),
            model: "fake".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_reply_wins() {
        let client = FakeLlm;
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("Question:\n-- reply: SELECT 42\n"),
        ];
        let resp = client.complete(&messages).await.unwrap();
        assert_eq!(resp.text, "SELECT 42");
    }

    #[tokio::test]
    async fn default_reply_without_directive() {
        let client = FakeLlm;
        let resp = client.complete(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(resp.text, "SELECT 1");
    }
}

//! Generic OpenAI-compatible provider.
//!
//! Works with any API that implements the OpenAI chat completions
//! interface: OpenAI itself, OpenRouter, Ollama, Groq, vLLM, LM Studio,
//! Hugging Face's router, etc.
//!
//! Config example:
//! ```yaml
//! model:
//!   endpoint: http://localhost:11434/v1/chat/completions
//!   model: qwen2.5-coder:32b
//!   api_key: $OLLAMA_KEY   # optional; local servers often need none
//! ```

use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{ModelProvider, ProviderResponse};

/// Provider that talks to any OpenAI-compatible chat completions API.
pub struct OpenAICompatProvider {
    api_key: String,
    endpoint: String,
    model: String,
    client: Client,
}

impl OpenAICompatProvider {
    /// Create a provider with explicit configuration.
    ///
    /// `api_key` may be empty for local servers that don't require auth.
    pub fn new(endpoint: String, api_key: String, model: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            api_key,
            endpoint,
            model,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelProvider for OpenAICompatProvider {
    async fn send_chat_with_functions(
        &self,
        messages: &[super::ChatMessage],
        functions: &[Value],
    ) -> anyhow::Result<ProviderResponse> {
        let mut body = json!({
            "model": self.model,
            "messages": super::serialize_messages(messages),
        });

        if !functions.is_empty() {
            body["tools"] = functions
                .iter()
                .map(|f| json!({ "type": "function", "function": f }))
                .collect();
            body["tool_choice"] = json!("auto");
        }

        let mut req = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let resp = req.send().await.context("chat completion request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI-compat API returned {status}: {text}");
        }

        let json: Value = resp.json().await.context("chat completion is not JSON")?;
        if let Some(usage) = super::parse_token_usage(&json) {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "token usage"
            );
        }

        Ok(super::parse_response(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_tools_and_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "m",
                "tool_choice": "auto",
                "tools": [{"type": "function", "function": {"name": "suggest_menu"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Pizza."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(
            format!("{}/v1/chat/completions", server.uri()),
            "sk-test".into(),
            "m".into(),
        )
        .unwrap();
        let resp = provider
            .send_chat_with_functions(
                &[ChatMessage::new("user", "menu?")],
                &[json!({"name": "suggest_menu", "description": "", "parameters": {}})],
            )
            .await
            .unwrap();
        assert_eq!(resp, ProviderResponse::Final("Pizza.".into()));
    }

    #[tokio::test]
    async fn http_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let provider =
            OpenAICompatProvider::new(server.uri(), String::new(), "m".into()).unwrap();
        let err = provider
            .send_chat_with_functions(&[ChatMessage::new("user", "hi")], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"), "{err}");
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails() {
        let provider = OpenAICompatProvider::new(
            "http://127.0.0.1:1/v1/chat/completions".into(),
            String::new(),
            "m".into(),
        )
        .unwrap();
        assert!(provider
            .send_chat_with_functions(&[ChatMessage::new("user", "hi")], &[])
            .await
            .is_err());
    }
}

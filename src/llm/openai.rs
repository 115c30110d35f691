use anyhow::Context;
use axum::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatClient, ChatMessage, CompletionOptions};
use crate::config::{LlmConfig, LlmProvider};

/// reqwest-backed client for OpenAI and Azure OpenAI chat completions.
#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    provider: LlmProvider,
    api_key: Option<String>,
    base_url: String,
    api_version: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder().build().context("build reqwest client")?;
        Ok(Self {
            client,
            provider: config.provider,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> anyhow::Result<Url> {
        let raw = match self.provider {
            LlmProvider::OpenAi => format!("{}/chat/completions", self.base_url),
            LlmProvider::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, model, self.api_version
            ),
        };
        Url::parse(&raw).with_context(|| format!("invalid completion endpoint {raw}"))
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("LLM API key is not configured"))?;

        let url = self.endpoint(&options.model)?;
        let body = CompletionRequest {
            // Azure selects the model through the deployment path.
            model: match self.provider {
                LlmProvider::OpenAi => Some(options.model.as_str()),
                LlmProvider::Azure => None,
            },
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let request = match self.provider {
            LlmProvider::OpenAi => self.client.post(url).bearer_auth(api_key),
            LlmProvider::Azure => self.client.post(url).header("api-key", api_key),
        };

        let response = request
            .json(&body)
            .send()
            .await
            .context("send completion request")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("completion request failed with {status}: {text}");
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .context("decode completion response")?;
        let content = extract_content(parsed)?;
        debug!(model = %options.model, chars = content.len(), "completion received");
        Ok(content)
    }
}

fn extract_content(response: CompletionResponse) -> anyhow::Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("completion response has no choices"))?;
    if content.trim().is_empty() {
        anyhow::bail!("completion response is empty");
    }
    Ok(content)
}

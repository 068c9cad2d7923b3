//! Content summaries from an OpenAI-compatible chat endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use unlockconf::SummarizerConfig;

use crate::storage::GatewayError;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, content: &str) -> Result<String, GatewayError>;
}

/// Prompt sent ahead of the uploaded text.
pub fn summary_prompt(content: &str) -> String {
    format!(
        "Provide a concise **3-4 sentence summary** of the following blog content.\n\
         Focus only on the main ideas and key insights:\n\n{content}"
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Summarizer backed by `POST {base_url}/chat/completions`.
pub struct ChatSummarizer {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ChatSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    #[tracing::instrument(name = "summarizer.chat", skip(self, content), fields(model = %self.model, chars = content.len()))]
    async fn summarize(&self, content: &str) -> Result<String, GatewayError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(summary_prompt(content)),
            }],
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                service: "summarizer",
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse {
                service: "summarizer",
                message: e.to_string(),
            })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::InvalidResponse {
                service: "summarizer",
                message: "no choices in completion".to_string(),
            })
    }
}

/// Used when no summarizer endpoint is configured; every call fails.
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _content: &str) -> Result<String, GatewayError> {
        Err(GatewayError::Disabled("summarizer"))
    }
}

/// Pick the chat summarizer when an endpoint is configured.
pub fn from_config(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>, GatewayError> {
    if config.enabled() {
        Ok(Arc::new(ChatSummarizer::new(config)?))
    } else {
        tracing::info!("no summarizer endpoint configured, uploads will be indexed without summaries");
        Ok(Arc::new(DisabledSummarizer))
    }
}

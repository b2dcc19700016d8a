//! Provider B: routed the rekening koran document type for the mapper
//! side of the Hybrid Bank Processor. Same OpenAI-compatible shape as
//! [`super::provider_a::ProviderA`] but kept as a distinct type so the two
//! providers can be configured, failed over, and metered independently.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmProviderConfig;

use super::provider::{LlmProvider, MapperError};

pub struct ProviderB {
    config: LlmProviderConfig,
    client: Client,
}

impl ProviderB {
    pub fn new(config: LlmProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build http client");
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl LlmProvider for ProviderB {
    fn provider_id(&self) -> &'static str {
        "provider_b"
    }

    async fn is_available(&self) -> bool {
        !self.config.endpoint.is_empty()
    }

    async fn complete(&self, prompt: &str) -> Result<String, MapperError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.endpoint))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    MapperError::Transient(e.to_string())
                } else {
                    MapperError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(MapperError::Transient(format!("provider_b http {status}")));
        }
        if !status.is_success() {
            return Err(MapperError::Permanent(format!("provider_b http {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| MapperError::Parse(format!("invalid provider_b response envelope: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MapperError::Parse("provider_b returned no choices".into()))
    }
}

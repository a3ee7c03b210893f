//! Chat-completion client used to turn a topic into source code.
//!
//! One request, one answer. The response text is returned as-is; nothing here
//! parses, validates or retries.

use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::io::config::GeneratorConfig;

/// Abstraction over completion backends.
pub trait Generator {
    /// Send one system/user exchange and return the assistant's text.
    fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Model name recorded in generation metadata.
    fn model(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionGenerator {
    client: Client,
    url: String,
    api_key: String,
    settings: GeneratorConfig,
}

impl ChatCompletionGenerator {
    pub fn new(settings: &GeneratorConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            url: completions_url(&settings.endpoint),
            api_key,
            settings: settings.clone(),
        })
    }
}

impl Generator for ChatCompletionGenerator {
    #[instrument(skip_all, fields(model = %self.settings.model))]
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = build_request(&self.settings, system, user);
        info!(url = %self.url, "requesting chat completion");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .with_context(|| format!("POST {}", self.url))?;

        let status = response.status();
        let body = response.text().context("read completion response")?;
        if !status.is_success() {
            bail!("completion request failed with status {status}: {body}");
        }

        let content = parse_completion(&body)?;
        debug!(chars = content.len(), "completion received");
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

pub fn completions_url(endpoint: &str) -> String {
    format!("{}/chat/completions", endpoint.trim_end_matches('/'))
}

pub fn build_request(
    settings: &GeneratorConfig,
    system: &str,
    user: &str,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: settings.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user.to_string(),
            },
        ],
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    }
}

/// Extract `choices[0].message.content` from a completion response body.
pub fn parse_completion(body: &str) -> Result<String> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).context("parse completion response")?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no choices in completion response"))?;
    choice
        .message
        .content
        .ok_or_else(|| anyhow!("completion response has no content"))
}

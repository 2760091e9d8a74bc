//! Claude API integration.
//!
//! Implements the GenerationBackend trait for Claude.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Generation, GenerationBackend, GenerationMethod};
use crate::core::AiConfig;
use crate::error::{AnalysisError, AnalysisResult};

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Claude API provider.
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeProvider {
    /// Create a new Claude provider.
    ///
    /// Reads API key from ANTHROPIC_API_KEY environment variable.
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY not set"))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: config.max_tokens,
        })
    }

    /// Create with a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Shape the request for a method.
    fn build_request(&self, prompt: &str, method: GenerationMethod) -> ClaudeRequest {
        let messages = vec![Message { role: "user".to_string(), content: prompt.to_string() }];

        match method {
            GenerationMethod::Reasoning => {
                let budget_tokens = (self.max_tokens / 2).max(1024);
                ClaudeRequest {
                    model: self.model.clone(),
                    max_tokens: self.max_tokens.max(budget_tokens + 1024),
                    system: None,
                    messages,
                    thinking: Some(Thinking { kind: "enabled", budget_tokens }),
                }
            }
            GenerationMethod::Chat => ClaudeRequest {
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                system: Some(
                    "Follow the section and format instructions in the user message exactly."
                        .to_string(),
                ),
                messages,
                thinking: None,
            },
            GenerationMethod::Completion => ClaudeRequest {
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                system: None,
                messages,
                thinking: None,
            },
        }
    }

    /// Make a request to the Claude API.
    async fn request(&self, request: &ClaudeRequest) -> AnalysisResult<Generation> {
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| AnalysisError::GenerationBackendFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::GenerationBackendFailure(format!(
                "API error ({}): {}",
                status, body
            )));
        }

        let response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::GenerationBackendFailure(e.to_string()))?;

        Ok(response.into_generation())
    }
}

#[async_trait]
impl GenerationBackend for ClaudeProvider {
    async fn generate(
        &self,
        prompt: &str,
        method: GenerationMethod,
    ) -> AnalysisResult<Generation> {
        let request = self.build_request(prompt, method);
        self.request(&request).await
    }

    fn name(&self) -> &str {
        "claude"
    }
}

/// Claude API request structure.
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<Thinking>,
}

/// Extended thinking settings.
#[derive(Debug, Serialize)]
struct Thinking {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: u32,
}

/// Message in a Claude request.
#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

/// Claude API response structure.
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

/// Content block in a Claude response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    #[serde(other)]
    Other,
}

impl ClaudeResponse {
    fn into_generation(self) -> Generation {
        let mut generation = Generation::default();
        for block in self.content {
            match block {
                ContentBlock::Text { text } => generation.output.push_str(&text),
                ContentBlock::Thinking { thinking } => generation.reasoning.push_str(&thinking),
                ContentBlock::Other => {}
            }
        }
        generation
    }
}

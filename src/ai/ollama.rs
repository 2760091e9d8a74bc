//! Ollama local LLM integration.
//!
//! Implements the GenerationBackend trait for Ollama (local LLM).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Generation, GenerationBackend, GenerationMethod};
use crate::core::AiConfig;
use crate::error::{AnalysisError, AnalysisResult};

/// Ollama API provider for local LLM.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider from configuration.
    ///
    /// `OLLAMA_HOST` and `OLLAMA_MODEL` override the configured values.
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| config.ollama.base_url.clone()),
            model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| config.ollama.model.clone()),
        })
    }

    /// Create with a specific base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Create with a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Call `/api/chat`, optionally with thinking enabled.
    async fn chat(&self, prompt: &str, think: bool) -> AnalysisResult<Generation> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }],
            stream: false,
            think: think.then_some(true),
        };

        let response: ChatResponse = self.post("/api/chat", &request).await?;
        Ok(Generation {
            reasoning: response.message.thinking.unwrap_or_default(),
            output: response.message.content,
        })
    }

    /// Call `/api/generate`.
    async fn complete(&self, prompt: &str) -> AnalysisResult<Generation> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response: GenerateResponse = self.post("/api/generate", &request).await?;
        Ok(Generation::output(response.response))
    }

    /// Make a request to the Ollama API.
    async fn post<Req, Resp>(&self, path: &str, request: &Req) -> AnalysisResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(request)
            .send()
            .await
            .map_err(|e| AnalysisError::GenerationBackendFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::GenerationBackendFailure(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| AnalysisError::GenerationBackendFailure(e.to_string()))
    }
}

#[async_trait]
impl GenerationBackend for OllamaProvider {
    async fn generate(
        &self,
        prompt: &str,
        method: GenerationMethod,
    ) -> AnalysisResult<Generation> {
        match method {
            GenerationMethod::Reasoning => self.chat(prompt, true).await,
            GenerationMethod::Chat => self.chat(prompt, false).await,
            GenerationMethod::Completion => self.complete(prompt).await,
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama chat request structure.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat response structure.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    thinking: Option<String>,
}

/// Ollama generate request structure.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Ollama generate response structure.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

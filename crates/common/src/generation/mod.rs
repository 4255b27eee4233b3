//! Text generation client abstraction
//!
//! Wraps the chat-completions API behind a trait so orchestrators can run
//! against deterministic in-process generators in tests. Token usage comes
//! back with every successful call; cost accounting happens in the caller.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One completed generation with its token usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
}

/// Trait for LLM text generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for a system + user prompt pair
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Generation>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Chat completions endpoint
    pub endpoint: String,

    /// API key
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum output tokens
    pub max_tokens: usize,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
            max_tokens: 1500,
            temperature: 0.7,
        }
    }
}

impl GeneratorConfig {
    /// Build client settings from the application generation config
    ///
    /// An absent API key becomes an empty credential; the mock provider
    /// ignores it and the OpenAI provider fails at request time.
    pub fn from_app(config: &crate::config::GenerationConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            ..Self::default()
        }
    }
}

/// OpenAI-compatible chat generation client
pub struct OpenAIGenerator {
    config: GeneratorConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: i32,
    #[serde(default)]
    completion_tokens: i32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

impl OpenAIGenerator {
    /// Create a new generation client
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Generation> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Generation {
                message: format!("LLM API request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation {
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| AppError::Generation {
                message: format!("Failed to parse LLM response: {}", e),
            })?;

        let text = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| AppError::Generation {
                message: "Empty response from LLM".to_string(),
            })?;

        Ok(Generation {
            text,
            input_tokens: chat_response.usage.prompt_tokens,
            output_tokens: chat_response.usage.completion_tokens,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Deterministic generator for tests
///
/// Echoes a canned response and reports token counts derived from the prompt
/// sizes, so cost accounting paths are exercised with stable numbers.
pub struct MockGenerator {
    response: String,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generate calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Rough 4-chars-per-token estimate
        let input_tokens = ((system_prompt.len() + user_prompt.len()) / 4) as i32;
        let output_tokens = (self.response.len() / 4) as i32;
        Ok(Generation {
            text: self.response.clone(),
            input_tokens,
            output_tokens,
        })
    }

    fn model_name(&self) -> &str {
        "mock-generation"
    }
}

/// Generator that fails a configured number of times before succeeding
///
/// Drives the retry path in the queued proposal worker.
pub struct FlakyGenerator {
    inner: MockGenerator,
    failures_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyGenerator {
    pub fn new(response: impl Into<String>, failures: usize) -> Self {
        Self {
            inner: MockGenerator::new(response),
            failures_remaining: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for FlakyGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::Generation {
                message: "simulated provider failure".to_string(),
            });
        }
        self.inner.generate(system_prompt, user_prompt).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Generator that always fails
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<Generation> {
        Err(AppError::Generation {
            message: "simulated provider failure".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-generation"
    }
}

/// Create a generator based on configuration
pub fn create_generator(
    provider: &str,
    config: GeneratorConfig,
) -> Result<Arc<dyn Generator>> {
    match provider {
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "mock" => Ok(Arc::new(MockGenerator::new(
            "Generated proposal draft for testing.",
        ))),
        _ => {
            tracing::warn!(provider = provider, "Unknown generation provider, using mock");
            Ok(Arc::new(MockGenerator::new(
                "Generated proposal draft for testing.",
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator_reports_usage() {
        let generator = MockGenerator::new("A short proposal draft.");
        let result = generator
            .generate("You write proposals.", "Write one for a Rust job.")
            .await
            .unwrap();
        assert_eq!(result.text, "A short proposal draft.");
        assert!(result.input_tokens > 0);
        assert!(result.output_tokens > 0);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_flaky_generator_recovers() {
        let generator = FlakyGenerator::new("ok", 2);
        assert!(generator.generate("s", "u").await.is_err());
        assert!(generator.generate("s", "u").await.is_err());
        let result = generator.generate("s", "u").await.unwrap();
        assert_eq!(result.text, "ok");
    }

    #[tokio::test]
    async fn test_failing_generator() {
        let err = FailingGenerator.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, AppError::Generation { .. }));
    }

    #[test]
    fn test_generator_config_from_app_handles_missing_key() {
        let mut app = crate::config::AppConfig::default().generation;
        app.api_key = None;
        let config = GeneratorConfig::from_app(&app);
        assert_eq!(config.api_key, "");
        assert_eq!(config.model, app.model);
        assert_eq!(config.endpoint, app.endpoint);

        app.api_key = Some("sk-test".to_string());
        assert_eq!(GeneratorConfig::from_app(&app).api_key, "sk-test");
    }
}

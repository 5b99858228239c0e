//! Hosted language model providers

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::{LlmConfig, LlmProvider};
use crate::{Error, Result};

/// Default Gemini API base URL
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default OpenAI-compatible API base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Low temperature keeps the reply close to the requested JSON shape
const TEMPERATURE: f32 = 0.2;

/// A text generator: one prompt in, one reply out
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a reply for the prompt
    ///
    /// # Errors
    ///
    /// Returns [`Error::Model`] if the provider is unreachable, answers with
    /// a non-success status, or returns no text
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Provider name for logs and status
    fn name(&self) -> &'static str;
}

/// Build the configured provider
///
/// # Errors
///
/// Returns [`Error::Config`] if no API key is configured
pub fn build_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        Error::Config(format!(
            "no API key for {} (set {})",
            config.provider,
            config.provider.api_key_env()
        ))
    })?;

    let model: Arc<dyn LanguageModel> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiModel::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
        )),
        LlmProvider::OpenAi => Arc::new(OpenAiModel::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
        )),
    };

    tracing::info!(provider = model.name(), model = %config.model, "language model configured");
    Ok(model)
}

/// Google Gemini `generateContent`
pub struct GeminiModel {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiModel {
    /// Create a Gemini provider
    #[must_use]
    pub fn new(api_key: SecretString, model: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Model(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!("Gemini API error: {status} - {body}")));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("Failed to parse Gemini response: {e}")))?;

        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::Model("Gemini returned no text".to_string()));
        }

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// OpenAI-compatible chat completions (OpenAI, OpenRouter, local servers)
pub struct OpenAiModel {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiModel {
    /// Create an OpenAI-compatible provider
    #[must_use]
    pub fn new(api_key: SecretString, model: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Model(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!("OpenAI API error: {status} - {body}")));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("Failed to parse OpenAI response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::Model("OpenAI returned no text".to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_a_config_error() {
        let config = LlmConfig::default();
        assert!(matches!(build_model(&config), Err(Error::Config(_))));
    }

    #[test]
    fn builds_configured_provider() {
        let config = LlmConfig {
            provider: LlmProvider::OpenAi,
            api_key: Some(SecretString::from("sk-test".to_string())),
            ..LlmConfig::default()
        };
        assert_eq!(build_model(&config).unwrap().name(), "openai");

        let config = LlmConfig {
            api_key: Some(SecretString::from("g-test".to_string())),
            ..LlmConfig::default()
        };
        assert_eq!(build_model(&config).unwrap().name(), "gemini");
    }

    #[test]
    fn gemini_response_shape() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"type\":"},{"text":"\"conversation\"}"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .filter_map(|p| p.text.clone())
            .collect();
        assert_eq!(text, r#"{"type":"conversation"}"#);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let model = OpenAiModel::new(
            SecretString::from("k".to_string()),
            "gpt-4o-mini".to_string(),
            Some("http://localhost:1234/v1/".to_string()),
        );
        assert_eq!(model.base_url, "http://localhost:1234/v1");
    }
}

//! Chat-completion suggestion generator (OpenAI-compatible API).

use crate::domain::error::CoachError;
use crate::ports::config_port::ConfigPort;
use crate::ports::suggestion_port::SuggestionGenerator;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

fn upstream(reason: impl Into<String>) -> CoachError {
    CoachError::UpstreamGeneration {
        reason: reason.into(),
    }
}

/// Blocking client; one instance is shared for the life of the process.
pub struct OpenAiSuggestionAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl OpenAiSuggestionAdapter {
    pub fn new(base_url: &str, api_key: &str, model: &str, temperature: f64) -> Result<Self, CoachError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
        })
    }

    /// Build from `[suggestions]`; the API key is read from the environment
    /// variable named by `api_key_env`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, CoachError> {
        let key_env = config
            .get_trimmed("suggestions", "api_key_env")
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = std::env::var(&key_env).map_err(|_| CoachError::ConfigMissing {
            section: "suggestions".into(),
            key: format!("{key_env} (environment)"),
        })?;
        let base_url = config
            .get_trimmed("suggestions", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = config
            .get_trimmed("suggestions", "model")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let temperature = config.get_double("suggestions", "temperature", DEFAULT_TEMPERATURE);

        Self::new(&base_url, &api_key, &model, temperature)
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        }
    }
}

fn first_choice_content(response: ChatResponse) -> Result<String, CoachError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| upstream("response contained no message content"))
}

impl SuggestionGenerator for OpenAiSuggestionAdapter {
    fn complete(&self, prompt: &str) -> Result<String, CoachError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(|e| upstream(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(upstream(format!("{} {body}", status.as_u16())));
        }

        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| upstream(format!("malformed response: {e}")))?;
        first_choice_content(parsed)
    }
}

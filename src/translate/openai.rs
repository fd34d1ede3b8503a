use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::TranslationService;
use crate::config::LlmConfig;
use crate::error::{PacklingoError, Result};

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completion client.
pub struct ChatService {
    client: Client,
    config: LlmConfig,
}

impl ChatService {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PacklingoError::Translation(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl TranslationService for ChatService {
    async fn complete(&self, system_prompt: &str, user_payload: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_payload.to_string(),
                },
            ],
            temperature: self.config.temperature,
        };

        let url = self.completions_url();
        debug!("Sending chat completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PacklingoError::Translation(format!(
                "Chat completion failed with {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        debug!("Raw assistant message: {}", content);
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            api_key: "sk-test".to_string(),
            model: "test-model".to_string(),
            temperature: 0.3,
            timeout_secs: 5,
            max_retries: 1,
        }
    }

    #[test]
    fn test_completions_url_handles_trailing_slash() {
        let service = ChatService::new(config("https://api.example.com/v1/")).unwrap();
        assert_eq!(
            service.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );

        let service = ChatService::new(config("https://api.example.com/v1")).unwrap();
        assert_eq!(
            service.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }
}

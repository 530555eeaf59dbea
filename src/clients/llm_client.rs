//! LLM (`OpenAI`) API client module
//!
//! Encapsulates all LLM API interactions for generating summaries.

use std::time::Duration;

use async_trait::async_trait;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use super::Summarizer;
use crate::errors::SummaryError;
use crate::prompt::{SYSTEM_PROMPT, estimate_tokens};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MAX_OUTPUT_TOKENS: usize = 1_500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// LLM API client for generating summaries
pub struct LlmClient {
    api_key: String,
    model_name: String,
    endpoint: String,
    http: Client,
}

impl LlmClient {
    #[must_use]
    pub fn new(api_key: String, model_name: String) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_key,
            model_name,
            endpoint: CHAT_COMPLETIONS_URL.to_string(),
            http,
        }
    }

    /// Points the client at a compatible endpoint (proxies, local models).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn build_prompt(&self, page_prompt: &str) -> Vec<ChatCompletionMessage> {
        vec![
            ChatCompletionMessage {
                role: MessageRole::system,
                content: Content::Text(SYSTEM_PROMPT.to_string()),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
            ChatCompletionMessage {
                role: MessageRole::user,
                content: Content::Text(page_prompt.to_string()),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
        ]
    }

    pub fn request_body(&self, prompt: &[ChatCompletionMessage]) -> Value {
        let messages: Vec<Value> = prompt
            .iter()
            .map(|msg| {
                let role_str = match msg.role {
                    MessageRole::system => "system",
                    MessageRole::user => "user",
                    MessageRole::assistant => "assistant",
                    MessageRole::function => "function",
                    MessageRole::tool => "tool",
                };
                let content_val = match &msg.content {
                    Content::Text(text) => json!(text),
                    Content::ImageUrl(_) => json!(""),
                };
                json!({ "role": role_str, "content": content_val })
            })
            .collect();

        json!({
            "model": self.model_name,
            "messages": messages,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "temperature": 0.3
        })
    }

    pub async fn generate_summary(
        &self,
        prompt: Vec<ChatCompletionMessage>,
    ) -> Result<String, SummaryError> {
        #[cfg(feature = "debug-logs")]
        info!("Using ChatGPT prompt:\n{:?}", prompt);

        let estimated_input_tokens = prompt
            .iter()
            .map(|msg| estimate_tokens(&format!("{:?}", msg.content)))
            .sum::<usize>();
        info!(
            model = %self.model_name,
            estimated_input_tokens,
            "requesting summary"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&prompt))
            .send()
            .await
            .map_err(|e| SummaryError::UpstreamFailure(format!("OpenAI API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SummaryError::UpstreamFailure(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let response_json: Value = response.json().await.map_err(|e| {
            SummaryError::UpstreamFailure(format!("Failed to parse OpenAI response: {e}"))
        })?;

        extract_completion_text(&response_json)
            .ok_or_else(|| SummaryError::UpstreamFailure("No text in response".to_string()))
    }
}

/// Pulls `choices[0].message.content` out of a chat-completions response.
pub fn extract_completion_text(response: &Value) -> Option<String> {
    response
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        if text.trim().is_empty() {
            return Err(SummaryError::InvalidArgument(
                "input text is empty".to_string(),
            ));
        }
        self.generate_summary(self.build_prompt(text)).await
    }
}

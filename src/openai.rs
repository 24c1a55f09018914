use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::types::ConversationTurn;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

// Discord's message limit is 2000 characters (standard users)
// Roughly 1 token ≈ 4 characters, so 2000 chars ≈ 500 tokens
const MAX_TOKENS: u32 = 512;

/// A chat completion backend.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    /// Returns the text of the first suggested reply for `turns`.
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationTurn],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model,
        }
    }
}

#[async_trait]
impl CompletionApi for OpenAiClient {
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String> {
        debug!("Sending request to OpenAI API with {} messages", turns.len());

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: turns,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(status_error(status, message));
        }

        let api_response: ChatCompletionResponse = response.json().await?;
        debug!("Received response from OpenAI API");
        first_choice(api_response)
    }
}

fn status_error(status: StatusCode, message: String) -> BotError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        BotError::RateLimited(message)
    } else {
        BotError::OpenAiApi { status, message }
    }
}

fn first_choice(response: ChatCompletionResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BotError::OpenAiResponse("No choices in response".to_string()))?
        .message
        .content
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(BotError::OpenAiResponse(
            "First choice has no content".to_string(),
        ));
    }
    Ok(content)
}

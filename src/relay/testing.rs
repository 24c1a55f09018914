//! Scripted fakes for the relay's outbound seams.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use poise::serenity_prelude::ChannelId;

use crate::error::{BotError, Result};
use crate::openai::CompletionApi;
use crate::types::{ChannelMessage, ConversationTurn};

use super::handler::ChatChannel;

/// Replays a fixed list of completion results and records every request.
pub struct ScriptedApi {
    responses: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl ScriptedApi {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rate_limit() -> BotError {
        BotError::RateLimited("Rate limit reached for requests".to_string())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn last_request(&self) -> Option<Vec<ConversationTurn>> {
        self.requests.lock().expect("requests lock").last().cloned()
    }
}

#[async_trait]
impl CompletionApi for ScriptedApi {
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(turns.to_vec());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(BotError::OpenAiResponse("script exhausted".to_string())))
    }
}

/// A channel with fixed history that counts typing indicators.
pub struct FakeChannel {
    pub history: Vec<ChannelMessage>,
    pub fail_history: bool,
    typing: AtomicUsize,
}

impl FakeChannel {
    pub fn new(history: Vec<ChannelMessage>) -> Self {
        Self {
            history,
            fail_history: false,
            typing: AtomicUsize::new(0),
        }
    }

    pub fn typing_count(&self) -> usize {
        self.typing.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatChannel for FakeChannel {
    async fn start_typing(&self, _channel: ChannelId) -> Result<()> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>> {
        if self.fail_history {
            return Err(BotError::Config("history unavailable".to_string()));
        }
        let in_channel: Vec<ChannelMessage> = self
            .history
            .iter()
            .filter(|msg| msg.channel_id == channel)
            .cloned()
            .collect();
        let start = in_channel.len().saturating_sub(limit);
        Ok(in_channel[start..].to_vec())
    }
}

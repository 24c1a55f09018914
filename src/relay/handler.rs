//! Per-message relay handler.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use poise::serenity_prelude::{ChannelId, UserId};

use crate::error::Result;
use crate::openai::CompletionApi;
use crate::types::ChannelMessage;

use super::context::{HISTORY_LIMIT, build_context};
use super::filter::{Disposition, IgnoreReason, classify};
use super::retry::{CompletionOutcome, RetryPolicy, complete_with_backoff};

/// The chat channel operations the relay needs before it can answer.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    async fn start_typing(&self, channel: ChannelId) -> Result<()>;

    /// Returns up to `limit` of the newest messages in `channel`, oldest first.
    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>>;
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub channel_id: ChannelId,
    pub bot_user_id: UserId,
    pub system_prompt: String,
    pub retry: RetryPolicy,
}

/// What the caller should do in response to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Ignore(IgnoreReason),
    Reply(String),
    /// Reply with [`crate::error::GENERIC_ERROR_REPLY`].
    ReplyError,
}

/// Handles one incoming message and describes the reply to post.
pub async fn handle_message<C, H>(
    message: &ChannelMessage,
    settings: &RelaySettings,
    completions: &C,
    channel: &H,
) -> Effect
where
    C: CompletionApi + ?Sized,
    H: ChatChannel + ?Sized,
{
    if let Disposition::Ignore(reason) = classify(message, settings.channel_id) {
        debug!("Ignoring message {} ({reason:?})", message.id);
        return Effect::Ignore(reason);
    }

    info!(
        "Received message from {} in channel {}: {}",
        message.author_name, message.channel_id, message.content
    );

    if let Err(e) = channel.start_typing(message.channel_id).await {
        debug!("Failed to broadcast typing indicator: {e}");
    }

    let history = match channel.recent_messages(message.channel_id, HISTORY_LIMIT).await {
        Ok(history) => history,
        Err(e) => {
            error!("Failed to fetch history for channel {}: {e}", message.channel_id);
            return Effect::ReplyError;
        }
    };

    let turns = build_context(&history, message, settings.bot_user_id, &settings.system_prompt);
    debug!("Conversation context has {} turns", turns.len());

    let report = complete_with_backoff(completions, &turns, settings.retry).await;
    match report.outcome {
        CompletionOutcome::Reply(text) => Effect::Reply(text),
        CompletionOutcome::Exhausted => {
            warn!(
                "Gave up on message from {} after {} rate-limited attempts",
                message.author_name, report.attempts
            );
            Effect::ReplyError
        }
        CompletionOutcome::Failed(e) => {
            error!("Error processing message from {}: {e}", message.author_name);
            Effect::ReplyError
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use poise::serenity_prelude::MessageId;
    use reqwest::StatusCode;
    use tokio::time::Instant;

    use super::*;
    use crate::error::BotError;
    use crate::relay::testing::{FakeChannel, ScriptedApi};
    use crate::types::MessageRole;

    const BOT: u64 = 100;
    const ALICE: u64 = 200;

    fn settings() -> RelaySettings {
        RelaySettings {
            channel_id: ChannelId::new(1),
            bot_user_id: UserId::new(BOT),
            system_prompt: "You are a friendly chatbot.".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    fn msg(id: u64, author: u64, content: &str) -> ChannelMessage {
        ChannelMessage {
            id: MessageId::new(id),
            channel_id: ChannelId::new(1),
            author_id: UserId::new(author),
            author_name: if author == BOT { "relay" } else { "alice" }.to_string(),
            author_is_bot: author == BOT,
            content: content.to_string(),
        }
    }

    fn conversation() -> (FakeChannel, ChannelMessage) {
        let trigger = msg(3, ALICE, "how are you?");
        let channel = FakeChannel::new(vec![
            msg(1, ALICE, "hi"),
            msg(2, BOT, "hello"),
            trigger.clone(),
        ]);
        (channel, trigger)
    }

    #[tokio::test]
    async fn replies_with_first_choice() {
        let (channel, trigger) = conversation();
        let api = ScriptedApi::new(vec![Ok("I'm great!".to_string())]);

        let effect = handle_message(&trigger, &settings(), &api, &channel).await;

        assert_eq!(effect, Effect::Reply("I'm great!".to_string()));
        assert_eq!(channel.typing_count(), 1);

        let sent = api.last_request().expect("one request");
        let roles: Vec<(MessageRole, &str)> = sent
            .iter()
            .map(|turn| (turn.role, turn.content.as_str()))
            .collect();
        assert_eq!(
            roles,
            vec![
                (MessageRole::System, "You are a friendly chatbot."),
                (MessageRole::User, "hi"),
                (MessageRole::Assistant, "hello"),
                (MessageRole::User, "how are you?"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_twice_then_one_reply() {
        let (channel, trigger) = conversation();
        let api = ScriptedApi::new(vec![
            Err(ScriptedApi::rate_limit()),
            Err(ScriptedApi::rate_limit()),
            Ok("sorry for the wait".to_string()),
        ]);

        let started = Instant::now();
        let effect = handle_message(&trigger, &settings(), &api, &channel).await;

        assert_eq!(effect, Effect::Reply("sorry for the wait".to_string()));
        assert_eq!(api.calls(), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3));
        assert!(waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_report_generic_error() {
        let (channel, trigger) = conversation();
        let api = ScriptedApi::new(vec![
            Err(ScriptedApi::rate_limit()),
            Err(ScriptedApi::rate_limit()),
            Err(ScriptedApi::rate_limit()),
        ]);

        let effect = handle_message(&trigger, &settings(), &api, &channel).await;

        assert_eq!(effect, Effect::ReplyError);
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test]
    async fn api_failure_reports_generic_error() {
        let (channel, trigger) = conversation();
        let api = ScriptedApi::new(vec![Err(BotError::OpenAiApi {
            status: StatusCode::UNAUTHORIZED,
            message: "invalid key".to_string(),
        })]);

        let effect = handle_message(&trigger, &settings(), &api, &channel).await;

        assert_eq!(effect, Effect::ReplyError);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn history_failure_skips_completion() {
        let (mut channel, trigger) = conversation();
        channel.fail_history = true;
        let api = ScriptedApi::new(vec![Ok("unused".to_string())]);

        let effect = handle_message(&trigger, &settings(), &api, &channel).await;

        assert_eq!(effect, Effect::ReplyError);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn filtered_messages_do_nothing() {
        let (channel, _) = conversation();
        let api = ScriptedApi::new(vec![]);

        let command = msg(4, ALICE, "!help");
        let from_bot = msg(5, BOT, "beep");
        let mut elsewhere = msg(6, ALICE, "hello?");
        elsewhere.channel_id = ChannelId::new(2);

        for (message, reason) in [
            (command, IgnoreReason::Command),
            (from_bot, IgnoreReason::BotAuthor),
            (elsewhere, IgnoreReason::OtherChannel),
        ] {
            let effect = handle_message(&message, &settings(), &api, &channel).await;
            assert_eq!(effect, Effect::Ignore(reason));
        }
        assert_eq!(api.calls(), 0);
        assert_eq!(channel.typing_count(), 0);
    }
}

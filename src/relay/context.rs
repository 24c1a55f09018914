//! Conversation context building from recent channel history.

use std::iter;

use poise::serenity_prelude::UserId;

use crate::types::{ChannelMessage, ConversationTurn, MessageRole};

use super::filter::is_command;

/// Number of channel messages, the trigger included, used to prime the model.
pub const HISTORY_LIMIT: usize = 15;

// The completion API rejects longer `name` fields.
const MAX_NAME_LEN: usize = 64;

/// Turns a display name into an identifier the completion API accepts.
///
/// Whitespace runs become `_`, everything outside `[A-Za-z0-9_]` is dropped.
/// Returns `None` when nothing is left.
pub fn normalize_name(display_name: &str) -> Option<String> {
    let name: String = display_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(MAX_NAME_LEN)
        .collect();

    (!name.is_empty()).then_some(name)
}

/// Builds the context for `trigger` from oldest-first channel `history`.
///
/// The trigger is appended only when `history` does not already hold it, so
/// newer messages fetched after it keep their place.
/// The result always starts with exactly one system turn. Only messages by the
/// bot (as `assistant`) and by the trigger's author (as `user`) are kept.
pub fn build_context(
    history: &[ChannelMessage],
    trigger: &ChannelMessage,
    bot_user_id: UserId,
    system_prompt: &str,
) -> Vec<ConversationTurn> {
    let mut window: Vec<&ChannelMessage> = history.iter().collect();
    if !history.iter().any(|msg| msg.id == trigger.id) {
        window.push(trigger);
    }
    let start = window.len().saturating_sub(HISTORY_LIMIT);

    iter::once(ConversationTurn::system(system_prompt))
        .chain(
            window[start..]
                .iter()
                .filter_map(|msg| to_turn(msg, trigger.author_id, bot_user_id)),
        )
        .collect()
}

fn to_turn(
    msg: &ChannelMessage,
    speaker_id: UserId,
    bot_user_id: UserId,
) -> Option<ConversationTurn> {
    if is_command(&msg.content) {
        return None;
    }

    let role = if msg.author_id == bot_user_id {
        MessageRole::Assistant
    } else if msg.author_id == speaker_id {
        MessageRole::User
    } else {
        return None;
    };

    Some(ConversationTurn {
        role,
        content: msg.content.clone(),
        name: normalize_name(&msg.author_name),
    })
}

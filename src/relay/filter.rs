//! Decides which incoming messages get relayed.

use poise::serenity_prelude::ChannelId;

use crate::types::ChannelMessage;

/// Messages starting with this are meant for other bots and are never relayed.
pub const COMMAND_PREFIX: char = '!';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotAuthor,
    OtherChannel,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Relay,
    Ignore(IgnoreReason),
}

pub fn is_command(content: &str) -> bool {
    content.starts_with(COMMAND_PREFIX)
}

/// Classifies an incoming message against the relayed channel.
pub fn classify(message: &ChannelMessage, relay_channel: ChannelId) -> Disposition {
    if message.author_is_bot {
        Disposition::Ignore(IgnoreReason::BotAuthor)
    } else if message.channel_id != relay_channel {
        Disposition::Ignore(IgnoreReason::OtherChannel)
    } else if is_command(&message.content) {
        Disposition::Ignore(IgnoreReason::Command)
    } else {
        Disposition::Relay
    }
}

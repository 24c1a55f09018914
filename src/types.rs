//! Common types used throughout the channelgpt relay.

use poise::serenity_prelude::{ChannelId, Message as SerenityMessage, MessageId, UserId};
use serde::{Deserialize, Serialize};

/// Role of a message in the conversation.
///
/// Maps to chat completion API message roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt or instructions
    System,
    /// Message from the human user
    User,
    /// Message from the AI assistant
    Assistant,
}

/// One entry of the context sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            name: None,
        }
    }
}

/// The parts of a Discord message the relay looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
}

impl From<&SerenityMessage> for ChannelMessage {
    fn from(msg: &SerenityMessage) -> Self {
        Self {
            id: msg.id,
            channel_id: msg.channel_id,
            author_id: msg.author.id,
            author_name: msg.author.name.clone(),
            author_is_bot: msg.author.bot,
            content: msg.content.clone(),
        }
    }
}

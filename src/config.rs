use std::env;

use log::{debug, error, info};
use poise::serenity_prelude::ChannelId;

use crate::error::{BotError, Result};

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly chatbot.";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub system_prompt: String,
    pub channel_id: ChannelId,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        let discord_token = required_var("DISCORD_TOKEN")?;
        let openai_api_key = required_var("OPENAI_API_KEY")?;
        let channel_id = parse_channel_id(&required_var("CHANNEL_ID")?)?;

        let openai_model = or_default(env::var("OPENAI_MODEL").ok(), DEFAULT_MODEL);
        let system_prompt = or_default(env::var("SYSTEM_PROMPT").ok(), DEFAULT_SYSTEM_PROMPT);

        info!("Configuration loaded successfully");
        debug!("Discord token length: {} characters", discord_token.len());
        debug!("OpenAI API key length: {} characters", openai_api_key.len());
        debug!("OpenAI model: {openai_model}");
        debug!("Relay channel: {channel_id}");
        debug!("System prompt length: {} characters", system_prompt.len());

        Ok(Self {
            discord_token,
            openai_api_key,
            openai_model,
            system_prompt,
            channel_id,
        })
    }
}

fn required_var(key: &str) -> Result<String> {
    env::var(key).map_err(|e| {
        error!("Failed to load {key} from environment: {e}");
        BotError::from(e)
    })
}

/// Falls back to `default` when an optional variable is unset or blank.
fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses a Discord channel snowflake.
pub fn parse_channel_id(raw: &str) -> Result<ChannelId> {
    let id = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| BotError::Config(format!("CHANNEL_ID '{raw}' is not a valid id: {e}")))?;
    if id == 0 {
        return Err(BotError::Config("CHANNEL_ID must not be zero".to_string()));
    }
    Ok(ChannelId::new(id))
}

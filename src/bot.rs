//! Discord client setup and event dispatch.

use std::error::Error as StdError;

use async_trait::async_trait;
use log::{debug, info};
use poise::{
    Framework, FrameworkOptions,
    serenity_prelude::{ChannelId, ClientBuilder, Context, FullEvent, GatewayIntents, Http},
};

use crate::config::Config;
use crate::error::{GENERIC_ERROR_REPLY, Result};
use crate::openai::OpenAiClient;
use crate::relay::{ChatChannel, Effect, RelaySettings, RetryPolicy, handle_message};
use crate::types::ChannelMessage;

type BoxError = Box<dyn StdError + Send + Sync>;
type EventResult = std::result::Result<(), BoxError>;

struct Data {
    completions: OpenAiClient,
    settings: RelaySettings,
}

/// Discord's REST API seen through the relay's [`ChatChannel`] seam.
struct DiscordChannel<'a> {
    http: &'a Http,
}

#[async_trait]
impl ChatChannel for DiscordChannel<'_> {
    async fn start_typing(&self, channel: ChannelId) -> Result<()> {
        self.http.broadcast_typing(channel).await?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>> {
        let limit = u8::try_from(limit).unwrap_or(u8::MAX);
        // Discord returns newest first
        let messages = self.http.get_messages(channel, None, Some(limit)).await?;
        Ok(messages.iter().rev().map(ChannelMessage::from).collect())
    }
}

/// Run the Discord bot.
pub async fn run() -> Result<()> {
    info!("Initializing bot");
    let config = Config::from_env()?;

    debug!("Initializing OpenAI client");
    let completions = OpenAiClient::new(config.openai_api_key.clone(), config.openai_model.clone());

    debug!("Setting up gateway intents");
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

    let discord_token = config.discord_token.clone();
    let channel_id = config.channel_id;
    let system_prompt = config.system_prompt;

    debug!("Building framework");
    let framework = Framework::builder()
        .options(FrameworkOptions {
            event_handler: |ctx, event, _framework, data| Box::pin(event_handler(ctx, event, data)),
            ..Default::default()
        })
        .setup(move |_ctx, ready, _framework| {
            Box::pin(async move {
                info!(
                    "Bot is ready and connected to Discord as {}, relaying channel {}",
                    ready.user.name, channel_id
                );
                Ok::<_, BoxError>(Data {
                    completions,
                    settings: RelaySettings {
                        channel_id,
                        bot_user_id: ready.user.id,
                        system_prompt,
                        retry: RetryPolicy::default(),
                    },
                })
            })
        })
        .build();

    debug!("Creating Discord client");
    let mut client = ClientBuilder::new(discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting Discord client");

    tokio::select! {
        result = client.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    Ok(())
}

async fn event_handler(ctx: &Context, event: &FullEvent, data: &Data) -> EventResult {
    if let FullEvent::Message { new_message } = event {
        let message = ChannelMessage::from(new_message);
        let channel = DiscordChannel { http: &ctx.http };

        match handle_message(&message, &data.settings, &data.completions, &channel).await {
            Effect::Ignore(_) => {}
            Effect::Reply(text) => {
                new_message.reply(&ctx.http, &text).await?;
                info!(
                    "Replied to {} in channel {}: {}",
                    new_message.author.tag(),
                    new_message.channel_id,
                    text
                );
            }
            Effect::ReplyError => {
                new_message.reply(&ctx.http, GENERIC_ERROR_REPLY).await?;
            }
        }
    }
    Ok(())
}

use thiserror::Error;

/// Reply posted for every failure; the cause only goes to the log.
pub const GENERIC_ERROR_REPLY: &str = "An error occurred while processing the request.";

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Serenity error: {0}")]
    Serenity(Box<poise::serenity_prelude::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("OpenAI API error ({status}): {message}")]
    OpenAiApi {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("OpenAI rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("OpenAI response error: {0}")]
    OpenAiResponse(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl From<poise::serenity_prelude::Error> for BotError {
    fn from(err: poise::serenity_prelude::Error) -> Self {
        BotError::Serenity(Box::new(err))
    }
}

impl BotError {
    /// Returns true for the one failure class the completion retrier retries.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, BotError::RateLimited(_))
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

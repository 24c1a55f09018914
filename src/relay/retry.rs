//! Bounded exponential backoff around the completion call.

use std::time::Duration;

use log::{debug, warn};
use tokio::time::sleep;

use crate::error::BotError;
use crate::openai::CompletionApi;
use crate::types::ConversationTurn;

/// How often and how long to back off when the completion API rate-limits us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay after the zero-based `attempt`: `min(2^attempt * base, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug)]
pub enum CompletionOutcome {
    Reply(String),
    /// Every attempt was rate-limited.
    Exhausted,
    /// A non rate-limit error; never retried.
    Failed(BotError),
}

/// What happened during one retried completion request.
#[derive(Debug)]
pub struct RetryReport {
    pub outcome: CompletionOutcome,
    pub attempts: u32,
    pub delays: Vec<Duration>,
}

/// Requests a completion, backing off and retrying only on rate limits.
pub async fn complete_with_backoff<C>(
    api: &C,
    turns: &[ConversationTurn],
    policy: RetryPolicy,
) -> RetryReport
where
    C: CompletionApi + ?Sized,
{
    let mut delays = Vec::new();

    for attempt in 0..policy.max_attempts {
        match api.complete(turns).await {
            Ok(reply) => {
                debug!("Completion succeeded on attempt {}", attempt + 1);
                return RetryReport {
                    outcome: CompletionOutcome::Reply(reply),
                    attempts: attempt + 1,
                    delays,
                };
            }
            Err(e) if e.is_rate_limit() => {
                // No point sleeping after the last attempt.
                if attempt + 1 < policy.max_attempts {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        "Rate limit exceeded (attempt {}/{}). Retrying after {}ms",
                        attempt + 1,
                        policy.max_attempts,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    delays.push(delay);
                }
            }
            Err(e) => {
                return RetryReport {
                    outcome: CompletionOutcome::Failed(e),
                    attempts: attempt + 1,
                    delays,
                };
            }
        }
    }

    warn!(
        "Maximum number of retries ({}) reached. Unable to process the request.",
        policy.max_attempts
    );
    RetryReport {
        outcome: CompletionOutcome::Exhausted,
        attempts: policy.max_attempts,
        delays,
    }
}

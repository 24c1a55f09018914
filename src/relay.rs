//! Channel relay - turns channel messages into completion replies.

mod context;
mod filter;
mod handler;
mod retry;
#[cfg(test)]
mod testing;

pub use context::{HISTORY_LIMIT, build_context, normalize_name};
pub use filter::{COMMAND_PREFIX, Disposition, IgnoreReason, classify};
pub use handler::{ChatChannel, Effect, RelaySettings, handle_message};
pub use retry::{CompletionOutcome, RetryPolicy, RetryReport, complete_with_backoff};

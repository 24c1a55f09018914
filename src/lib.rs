pub mod bot;
pub mod config;
pub mod error;
pub mod openai;
pub mod relay;
pub mod types;

pub use bot::run;

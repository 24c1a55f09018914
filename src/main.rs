#[tokio::main]
async fn main() -> channelgpt::error::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("channelgpt=info,serenity=warn"),
    )
    .init();
    log::info!("Starting channelgpt Discord relay");

    match channelgpt::run().await {
        Ok(()) => {
            log::info!("Bot shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bot encountered an error: {e}");
            Err(e)
        }
    }
}

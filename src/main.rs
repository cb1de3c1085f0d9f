use anyhow::Result;
use practice_tracker::{config::Config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    logging::init()?;
    if let Err(e) = dotenv {
        log::debug!("No .env file loaded: {}", e);
    }

    let config = Config::load()?;
    practice_tracker::run(config).await
}

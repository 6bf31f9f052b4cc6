use anyhow::Result;
use fundscout::utils::logging;
use fundscout::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env();

    let stats = App::initialize(config).await?.run().await?;
    tracing::info!(
        "exit: {} top-level programs, {} nested",
        stats.top_level,
        stats.children
    );

    Ok(())
}

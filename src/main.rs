use anyhow::Result;
use tracing::info;

use telugu_translate::{config::Config, scheduler, server, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telugu_translate=info".parse()?),
        )
        .init();

    info!("Starting Telugu translation service");

    let config = Config::from_env()?;
    let state = AppState::from_config(config).await?;
    info!(
        "Provider chain: {}",
        state.translator.provider_names().join(" -> ")
    );

    // Keep the scheduler alive for the lifetime of the server
    let _scheduler = scheduler::start_scheduler(state.clone()).await?;

    server::run(state).await
}

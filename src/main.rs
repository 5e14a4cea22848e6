use anyhow::Context;
use domain_age_service::{config::Config, server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "domain_age_service=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::load().context("failed to load configuration")?;
    info!("Configuration loaded successfully");

    server::serve(&config).await.context("server terminated with an error")?;

    Ok(())
}

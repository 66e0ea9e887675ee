/// hashvault server entry point
use hashvault::{config::ServerConfig, context::AppContext, error::VaultResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> VaultResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| "info".into());
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("hashvault v{} starting", env!("CARGO_PKG_VERSION"));

    // Create application context (also creates the storage directory)
    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

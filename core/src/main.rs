/// VanishLink chat client - main entry point
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vanishlink_core::responder::{random_display_name, CannedResponder};
use vanishlink_core::{ChatSession, Config, UserProfile};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse configuration
    let args: Vec<String> = env::args().collect();
    let config = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let user = UserProfile::new(
        uuid::Uuid::new_v4().to_string(),
        random_display_name(),
        false,
    );
    info!("Starting VanishLink client");
    info!("   User: {} ({})", user.name, user.id);
    info!("   Server: {}", config.server_addr);

    let auto_responder = config.auto_responder;
    let mut session = ChatSession::new(user, config);
    if auto_responder {
        session = session.with_responder(Arc::new(CannedResponder::new()));
    }

    session
        .connect()
        .await
        .map_err(|e| anyhow::anyhow!("Connection error: {}", e))?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");
    session.disconnect().await;

    Ok(())
}

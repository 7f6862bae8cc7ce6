use anyhow::{Context, Result};
use linked_content_translation::{config, server, translation};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("linked_content_translation=info".parse()?),
        )
        .init();

    let config = config::Config::from_env()?;

    let http = reqwest::Client::new();
    let translator = translation::provider_from_config(&config, http.clone())?;
    info!("Using translation provider: {}", translator.provider_name());

    let state = server::AppState {
        config: Arc::new(config.clone()),
        http,
        translator,
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    axum::serve(listener, server::router(state))
        .await
        .context("Server error")?;

    Ok(())
}

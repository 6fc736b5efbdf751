//! One-Shield Telco Ingest Server
//!
//! Accepts CDR / SMS file uploads, scores every record and returns a
//! summary of the threats found.

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oneshield_ingest::{config::Config, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging (JSON lines in production)
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "oneshield_ingest=debug,tower_http=debug".into()));
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("One-Shield Telco Ingest starting...");
    tracing::info!(
        "High-risk threshold: {}, classifier timeout: {} ms, correlation: {:?}",
        config.high_risk_threshold, config.classifier_timeout_ms, config.correlation
    );

    let port = config.port;
    let state = AppState::from_config(config).await?;

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

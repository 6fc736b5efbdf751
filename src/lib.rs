//! One-Shield Telco Ingest
//!
//! Bulk analysis of call detail records and SMS logs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  ONE-SHIELD TELCO INGEST                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  upload ──► Decoder ──► Normalizer ──► Orchestrator ──┐      │
//! │             (rows)      (CDR / SMS)    │              │      │
//! │                                        ▼              ▼      │
//! │                                   Classifier     Aggregator  │
//! │                                        │              │      │
//! │                                        ▼              ▼      │
//! │                                  Verdict Store     Summary   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod handlers;
pub mod ingest;
pub mod classifier;
pub mod store;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use classifier::{Classifier, RuleClassifier};
use config::{Config, StoreBackend};
use ingest::{IngestionPipeline, Orchestrator};
use store::{MemoryVerdictStore, PgVerdictStore, VerdictStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub store: Arc<dyn VerdictStore>,
    pub store_name: &'static str,
    pub config: Config,
}

impl AppState {
    /// Wire the pipeline around an existing store and classifier
    pub fn new(config: Config, store: Arc<dyn VerdictStore>, store_name: &'static str, classifier: Arc<dyn Classifier>) -> Self {
        let orchestrator = Orchestrator::new(classifier, store.clone(), config.orchestrator_config());
        let pipeline = IngestionPipeline::new(orchestrator, config.risk_policy(), config.ingest_options());

        Self {
            pipeline: Arc::new(pipeline),
            store,
            store_name,
            config,
        }
    }

    /// Build state from configuration, connecting to Postgres when configured
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let classifier: Arc<dyn Classifier> = Arc::new(RuleClassifier::default());

        let state = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for the postgres store"))?;

                tracing::info!("Database: {}", url.split('@').last().unwrap_or("***"));
                let pool = db::create_pool(&url).await?;

                tracing::info!("Running database migrations...");
                db::run_migrations(&pool).await?;

                Self::new(config, Arc::new(PgVerdictStore::new(pool)), "postgres", classifier)
            }
            StoreBackend::Memory => {
                tracing::warn!(
                    "Using in-memory verdict store (capacity {}); verdicts are lost on restart",
                    config.memory_store_capacity
                );
                let store = MemoryVerdictStore::with_capacity(config.memory_store_capacity);
                Self::new(config, Arc::new(store), "memory", classifier)
            }
        };

        Ok(state)
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    let api_routes = Router::new()
        // Ingestion
        .route("/api/v1/ingest/:kind", post(handlers::ingest::upload))

        // Verdicts
        .route("/api/v1/verdicts", get(handlers::verdicts::list))
        .route("/api/v1/verdicts/source/:source", get(handlers::verdicts::by_source))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

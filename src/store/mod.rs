//! Verdict Store
//!
//! Durable record of verdicts, shared across ingestion runs. Two backends:
//! - `memory`: process-local, newest first
//! - `postgres`: `verdicts` table (see `db::run_migrations`)

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::Verdict;

pub use memory::MemoryVerdictStore;
pub use postgres::PgVerdictStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

#[async_trait]
pub trait VerdictStore: Send + Sync {
    /// Record a verdict. No uniqueness is enforced.
    async fn put(&self, verdict: &Verdict) -> Result<(), StoreError>;

    /// The `limit` most recently recorded verdicts, newest first, skipping `offset`.
    async fn recent(&self, limit: usize, offset: usize) -> Result<Vec<Verdict>, StoreError>;

    /// Verdicts for one source identifier, newest first.
    async fn by_source(&self, source: &str, limit: usize) -> Result<Vec<Verdict>, StoreError>;
}

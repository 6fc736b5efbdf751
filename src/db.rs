//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Verdicts produced by bulk CDR/SMS ingestion
CREATE TABLE IF NOT EXISTS verdicts (
    seq BIGSERIAL UNIQUE,
    id UUID PRIMARY KEY,
    threat_type VARCHAR(64) NOT NULL,
    risk_score DOUBLE PRECISION NOT NULL,
    source TEXT NOT NULL,
    record_id TEXT NOT NULL,
    record_kind VARCHAR(8) NOT NULL,
    reasons JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_verdicts_seq ON verdicts(seq DESC);
CREATE INDEX IF NOT EXISTS idx_verdicts_source ON verdicts(source, seq DESC);
CREATE INDEX IF NOT EXISTS idx_verdicts_threat_type ON verdicts(threat_type);
"#;

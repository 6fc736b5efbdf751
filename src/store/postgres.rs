//! PostgreSQL verdict store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::{StoreError, VerdictStore};
use crate::models::{RecordKind, Verdict};

#[derive(Debug, Clone)]
pub struct PgVerdictStore {
    pool: PgPool,
}

impl PgVerdictStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn verdict_from_row(row: &PgRow) -> Result<Verdict, StoreError> {
    let kind: String = row.try_get("record_kind")?;
    let record_kind = kind
        .parse::<RecordKind>()
        .map_err(StoreError::Database)?;

    let reasons: Option<serde_json::Value> = row.try_get("reasons")?;
    let reasons = reasons
        .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok())
        .unwrap_or_default();

    Ok(Verdict {
        id: row.try_get::<Uuid, _>("id")?,
        threat_type: row.try_get("threat_type")?,
        risk_score: row.try_get("risk_score")?,
        source: row.try_get("source")?,
        record_id: row.try_get("record_id")?,
        record_kind,
        reasons,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl VerdictStore for PgVerdictStore {
    async fn put(&self, verdict: &Verdict) -> Result<(), StoreError> {
        let reasons = serde_json::to_value(&verdict.reasons)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO verdicts (id, threat_type, risk_score, source, record_id, record_kind, reasons, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#
        )
        .bind(verdict.id)
        .bind(&verdict.threat_type)
        .bind(verdict.risk_score)
        .bind(&verdict.source)
        .bind(&verdict.record_id)
        .bind(verdict.record_kind.as_str())
        .bind(&reasons)
        .bind(verdict.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: usize, offset: usize) -> Result<Vec<Verdict>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM verdicts
            ORDER BY seq DESC
            LIMIT $1 OFFSET $2
            "#
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(verdict_from_row).collect()
    }

    async fn by_source(&self, source: &str, limit: usize) -> Result<Vec<Verdict>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM verdicts
            WHERE source = $1
            ORDER BY seq DESC
            LIMIT $2
            "#
        )
        .bind(source)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(verdict_from_row).collect()
    }
}

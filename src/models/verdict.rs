//! Verdict model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{CanonicalRecord, RecordKind};

/// Threat verdict for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub id: Uuid,
    /// Threat category tag (smishing, wangiri, spam, ...)
    pub threat_type: String,
    /// Risk score, conventionally 0.0 - 10.0
    pub risk_score: f64,
    /// Origin number of the record, used for lookups
    pub source: String,
    pub record_id: String,
    pub record_kind: RecordKind,
    pub reasons: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Verdict {
    pub fn for_record(record: &CanonicalRecord, threat_type: impl Into<String>, risk_score: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            threat_type: threat_type.into(),
            risk_score,
            source: record.origin().to_string(),
            record_id: record.id().to_string(),
            record_kind: record.kind(),
            reasons: vec![],
            created_at: Utc::now(),
        }
    }

    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }
}

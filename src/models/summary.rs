//! Ingestion summary model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate report for one ingestion run. Built once by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_records: u64,
    pub threats_detected: u64,
    pub high_risk_records: u64,
    pub average_risk_score: f64,
    pub threats_by_type: BTreeMap<String, u64>,
    /// Records where at least one field fell back to its default
    pub degraded_records: u64,
    pub classification_failures: u64,
    pub correlation_misses: u64,
    pub store_failures: u64,
    pub processed_at: DateTime<Utc>,
}

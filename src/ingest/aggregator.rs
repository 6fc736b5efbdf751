//! Aggregator
//!
//! Running totals for one ingestion run. Pure accumulation, no I/O.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::RecordError;
use crate::models::{Summary, Verdict};

/// Verdicts scoring at or above this are high risk
pub const DEFAULT_HIGH_RISK_THRESHOLD: f64 = 7.0;

/// Aggregation policy, injected by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// Inclusive
    pub high_risk_threshold: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            high_risk_threshold: DEFAULT_HIGH_RISK_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    policy: RiskPolicy,
    total_records: u64,
    threats_detected: u64,
    high_risk_records: u64,
    risk_score_sum: f64,
    threats_by_type: BTreeMap<String, u64>,
    degraded_records: u64,
    classification_failures: u64,
    correlation_misses: u64,
    store_failures: u64,
}

impl Aggregator {
    pub fn new(policy: RiskPolicy) -> Self {
        Self {
            policy,
            total_records: 0,
            threats_detected: 0,
            high_risk_records: 0,
            risk_score_sum: 0.0,
            threats_by_type: BTreeMap::new(),
            degraded_records: 0,
            classification_failures: 0,
            correlation_misses: 0,
            store_failures: 0,
        }
    }

    /// Count one processed record, threat or not.
    pub fn observe_record(&mut self, degraded: bool) {
        self.total_records += 1;
        if degraded {
            self.degraded_records += 1;
        }
    }

    /// Fold in the outcome for one record. `None` adds nothing.
    pub fn observe_verdict(&mut self, verdict: Option<&Verdict>) {
        let Some(verdict) = verdict else {
            return;
        };

        self.threats_detected += 1;
        if verdict.risk_score >= self.policy.high_risk_threshold {
            self.high_risk_records += 1;
        }
        self.risk_score_sum += verdict.risk_score;
        *self.threats_by_type.entry(verdict.threat_type.clone()).or_insert(0) += 1;
    }

    /// Tally a per-record failure for reporting
    pub fn observe_failure(&mut self, error: &RecordError) {
        match error {
            RecordError::Classification(_) => self.classification_failures += 1,
            RecordError::CorrelationMiss { .. } => self.correlation_misses += 1,
            RecordError::Store(_) => self.store_failures += 1,
        }
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    /// Snapshot of the totals, stamped now. Does not reset anything.
    pub fn finalize(&self) -> Summary {
        let average_risk_score = if self.threats_detected == 0 {
            0.0
        } else {
            self.risk_score_sum / self.threats_detected as f64
        };

        Summary {
            total_records: self.total_records,
            threats_detected: self.threats_detected,
            high_risk_records: self.high_risk_records,
            average_risk_score,
            threats_by_type: self.threats_by_type.clone(),
            degraded_records: self.degraded_records,
            classification_failures: self.classification_failures,
            correlation_misses: self.correlation_misses,
            store_failures: self.store_failures,
            processed_at: Utc::now(),
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(RiskPolicy::default())
    }
}

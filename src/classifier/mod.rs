//! Classifier Module
//!
//! Scores one canonical record and returns a threat verdict.
//!
//! ## Structure
//! - `rules`: Thresholds, weights and keyword lists
//! - `engine`: Built-in rule-based classifier
//!
//! The pipeline only sees the `Classifier` trait, so a model-backed scorer
//! can replace `RuleClassifier` without touching orchestration.

pub mod rules;
pub mod engine;

use async_trait::async_trait;

use crate::models::{CanonicalRecord, Verdict};

pub use engine::RuleClassifier;
pub use rules::{ClassifierRules, REPORT_MIN_SCORE};

/// Classifier failure. Recovered per record by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Classifier timed out after {0} ms")]
    Timeout(u64),

    #[error("Classifier rejected record: {0}")]
    Rejected(String),

    #[error("Malformed classifier response: {0}")]
    Malformed(String),
}

/// Threat scoring capability
///
/// `Ok(None)` means the record was scored and is clean. Only threats
/// produce a `Verdict`.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, record: &CanonicalRecord) -> Result<Option<Verdict>, ClassificationError>;
}

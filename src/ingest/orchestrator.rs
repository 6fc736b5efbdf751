//! Classification Orchestrator
//!
//! One record at a time: classify (bounded by a timeout), persist the
//! verdict, resolve which verdict belongs to the record. Every failure is
//! absorbed here and reported through `RecordOutcome`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::RecordError;
use crate::classifier::rules::MAX_RISK_SCORE;
use crate::classifier::{ClassificationError, Classifier};
use crate::models::{CanonicalRecord, Verdict};
use crate::store::VerdictStore;

pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 5_000;

/// How many recent verdicts the window lookup scans
pub const DEFAULT_CORRELATION_WINDOW: usize = 10;

/// How a record is matched with its verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CorrelationMode {
    /// Use the verdict returned by the classifier
    #[default]
    Direct,
    /// Re-read the `window` newest stored verdicts and match on source.
    /// Racy when several records share an origin number or other runs
    /// write to the same store.
    RecentWindow { window: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub classifier_timeout: Duration,
    pub correlation: CorrelationMode,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            classifier_timeout: Duration::from_millis(DEFAULT_CLASSIFIER_TIMEOUT_MS),
            correlation: CorrelationMode::Direct,
        }
    }
}

/// Result of processing one record
///
/// A verdict and an error can coexist: a verdict whose persistence failed
/// still counts toward the aggregates in direct mode.
#[derive(Debug, Default)]
pub struct RecordOutcome {
    pub verdict: Option<Verdict>,
    pub error: Option<RecordError>,
}

impl RecordOutcome {
    fn clean() -> Self {
        Self::default()
    }

    fn failed(error: RecordError) -> Self {
        Self { verdict: None, error: Some(error) }
    }

    pub fn into_verdict(self) -> Option<Verdict> {
        self.verdict
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn VerdictStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(classifier: Arc<dyn Classifier>, store: Arc<dyn VerdictStore>, config: OrchestratorConfig) -> Self {
        Self { classifier, store, config }
    }

    /// Classify, persist and correlate one record. At most one classifier call.
    pub async fn process_record(&self, record: &CanonicalRecord) -> RecordOutcome {
        let mut verdict = match self.classify(record).await {
            Ok(Some(v)) => v,
            Ok(None) => return RecordOutcome::clean(),
            Err(e) => {
                tracing::warn!("Error analyzing {} record {}: {}", record.kind(), record.id(), e);
                return RecordOutcome::failed(e.into());
            }
        };

        verdict.source = record.origin().to_string();
        let stored = self.store.put(&verdict).await;

        match self.config.correlation {
            CorrelationMode::Direct => match stored {
                Ok(()) => RecordOutcome { verdict: Some(verdict), error: None },
                Err(e) => {
                    tracing::warn!("Failed to persist verdict for record {}: {}", record.id(), e);
                    RecordOutcome { verdict: Some(verdict), error: Some(e.into()) }
                }
            },
            CorrelationMode::RecentWindow { window } => {
                if let Err(e) = stored {
                    tracing::warn!("Failed to persist verdict for record {}: {}", record.id(), e);
                    return RecordOutcome::failed(e.into());
                }
                self.correlate(record, window).await
            }
        }
    }

    async fn classify(&self, record: &CanonicalRecord) -> Result<Option<Verdict>, ClassificationError> {
        let timeout = self.config.classifier_timeout;
        let verdict = match tokio::time::timeout(timeout, self.classifier.classify(record)).await {
            Ok(result) => result?,
            Err(_) => return Err(ClassificationError::Timeout(timeout.as_millis() as u64)),
        };

        match verdict {
            Some(v) if !(0.0..=MAX_RISK_SCORE).contains(&v.risk_score) => Err(ClassificationError::Malformed(
                format!("risk score {} outside 0..={}", v.risk_score, MAX_RISK_SCORE),
            )),
            other => Ok(other),
        }
    }

    /// Newest stored verdict in the window whose source is the record's origin
    async fn correlate(&self, record: &CanonicalRecord, window: usize) -> RecordOutcome {
        let recent = match self.store.recent(window, 0).await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Failed to read recent verdicts for record {}: {}", record.id(), e);
                return RecordOutcome::failed(e.into());
            }
        };

        match recent.into_iter().find(|v| v.source == record.origin()) {
            Some(v) => RecordOutcome { verdict: Some(v), error: None },
            None => {
                tracing::warn!(
                    "No verdict for origin '{}' in the {} most recent (record {})",
                    record.origin(), window, record.id()
                );
                RecordOutcome::failed(RecordError::CorrelationMiss {
                    origin: record.origin().to_string(),
                })
            }
        }
    }
}

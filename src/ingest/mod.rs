//! Ingest Module
//!
//! Bulk CDR/SMS ingestion: tabular bytes in, one `Summary` out.
//!
//! ## Structure
//! - `decoder`: Delimited text -> raw rows (lazy, file order)
//! - `normalizer`: Raw row -> canonical call / message record
//! - `orchestrator`: Classify, persist and correlate one record
//! - `aggregator`: Running totals -> `Summary`
//! - `pipeline`: Wires the four together for one run
//!
//! ## Usage
//! ```ignore
//! let pipeline = IngestionPipeline::new(orchestrator, RiskPolicy::default(), IngestOptions::default());
//! let summary = pipeline.run(&bytes, RecordKind::Sms).await?;
//! println!("{} threats in {} records", summary.threats_detected, summary.total_records);
//! ```

pub mod error;
pub mod decoder;
pub mod normalizer;
pub mod orchestrator;
pub mod aggregator;
pub mod pipeline;

#[cfg(test)]
mod tests;

pub use error::{DecodeError, IngestError, RecordError};
pub use decoder::{decode_all, TabularDecoder, DEFAULT_DELIMITER};
pub use normalizer::{normalize, normalize_with_report, NormalizationReport};
pub use orchestrator::{
    CorrelationMode, Orchestrator, OrchestratorConfig, RecordOutcome,
    DEFAULT_CLASSIFIER_TIMEOUT_MS, DEFAULT_CORRELATION_WINDOW,
};
pub use aggregator::{Aggregator, RiskPolicy, DEFAULT_HIGH_RISK_THRESHOLD};
pub use pipeline::{IngestOptions, IngestionPipeline, PartialRun, RunState};

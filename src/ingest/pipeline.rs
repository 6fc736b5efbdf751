//! Ingestion Pipeline
//!
//! Decoder -> Normalizer -> Orchestrator -> Aggregator, strictly in file
//! order, one record in flight at a time.
//!
//! ```text
//! Idle -> Decoding -> (normalize -> classify -> aggregate)* -> Finalized
//!                  \-> Failed (malformed byte stream only)
//! ```

use std::fmt;

use chrono::Utc;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::aggregator::{Aggregator, RiskPolicy};
use super::decoder::{TabularDecoder, DEFAULT_DELIMITER};
use super::error::{DecodeError, IngestError};
use super::normalizer::normalize_with_report;
use super::orchestrator::Orchestrator;
use crate::models::{RecordKind, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Decoding,
    Finalized,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Decoding => "decoding",
            RunState::Finalized => "finalized",
            RunState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Stop after this many data rows (at a row boundary)
    pub max_records: Option<usize>,
    pub delimiter: char,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_records: None,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// Outcome of a lenient run: whatever was aggregated before decoding stopped
#[derive(Debug, Serialize)]
pub struct PartialRun {
    pub summary: Summary,
    pub state: RunState,
    #[serde(serialize_with = "serialize_error")]
    pub decode_error: Option<DecodeError>,
}

fn serialize_error<S: serde::Serializer>(error: &Option<DecodeError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    orchestrator: Orchestrator,
    policy: RiskPolicy,
    options: IngestOptions,
}

impl IngestionPipeline {
    pub fn new(orchestrator: Orchestrator, policy: RiskPolicy, options: IngestOptions) -> Self {
        Self { orchestrator, policy, options }
    }

    /// Process a whole file. A malformed stream fails the run with no summary.
    pub async fn run(&self, data: &[u8], kind: RecordKind) -> Result<Summary, IngestError> {
        let partial = self.run_partial(data, kind).await;
        match partial.decode_error {
            Some(e) => Err(IngestError::Decode(e)),
            None => Ok(partial.summary),
        }
    }

    /// Process a file, keeping the aggregate of rows handled before a decode failure.
    pub async fn run_partial(&self, data: &[u8], kind: RecordKind) -> PartialRun {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("ingest", %run_id, %kind);
        self.drive(data, kind).instrument(span).await
    }

    async fn drive(&self, data: &[u8], kind: RecordKind) -> PartialRun {
        let mut aggregator = Aggregator::new(self.policy);
        let mut state = RunState::Idle;
        tracing::info!("Ingestion started ({} bytes)", data.len());

        let decoder = match TabularDecoder::with_delimiter(data, self.options.delimiter) {
            Ok(d) => d,
            Err(e) => return Self::fail(state, aggregator, e),
        };
        state = transition(state, RunState::Decoding);

        let limit = self.options.max_records.unwrap_or(usize::MAX);
        let mut rows = decoder.peekable();
        while let Some(row) = rows.next_if(|_| (aggregator.total_records() as usize) < limit) {
            let row = match row {
                Ok(r) => r,
                Err(e) => return Self::fail(state, aggregator, e),
            };

            let (record, report) = normalize_with_report(&row, kind, Utc::now());
            if report.is_degraded() {
                tracing::debug!("Record {} defaulted fields: {:?}", record.id(), report.defaulted);
            }

            let outcome = self.orchestrator.process_record(&record).await;

            aggregator.observe_record(report.is_degraded());
            if let Some(e) = &outcome.error {
                aggregator.observe_failure(e);
            }
            aggregator.observe_verdict(outcome.verdict.as_ref());
        }

        if rows.peek().is_some() {
            tracing::info!("Record limit {} reached, remaining rows skipped", limit);
        }

        let summary = aggregator.finalize();
        let state = transition(state, RunState::Finalized);
        tracing::info!(
            "Ingestion finished: {} records, {} threats, {} high risk",
            summary.total_records, summary.threats_detected, summary.high_risk_records
        );

        PartialRun {
            summary,
            state,
            decode_error: None,
        }
    }

    fn fail(state: RunState, aggregator: Aggregator, error: DecodeError) -> PartialRun {
        tracing::error!(
            "Ingestion failed after {} records: {}",
            aggregator.total_records(),
            error
        );
        PartialRun {
            summary: aggregator.finalize(),
            state: transition(state, RunState::Failed),
            decode_error: Some(error),
        }
    }
}

fn transition(from: RunState, to: RunState) -> RunState {
    tracing::debug!("Run state {} -> {}", from, to);
    to
}

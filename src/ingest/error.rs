//! Ingestion error taxonomy
//!
//! Only `IngestError` leaves a run. Everything in `RecordError` is absorbed
//! per record and shows up as a counter in the summary.

use crate::classifier::ClassificationError;
use crate::store::StoreError;

/// Malformed tabular byte stream. Fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid UTF-8 on line {line}")]
    Encoding { line: usize },

    #[error("Unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error("Unexpected quote on line {line}")]
    StrayQuote { line: usize },

    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnCount { line: usize, expected: usize, found: usize },

    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-record failure. Never fatal.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Classification failed: {0}")]
    Classification(#[from] ClassificationError),

    #[error("No recent verdict matches origin '{origin}'")]
    CorrelationMiss { origin: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Malformed input: {0}")]
    Decode(#[from] DecodeError),
}

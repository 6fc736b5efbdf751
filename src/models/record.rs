//! Canonical record model
//!
//! Every ingested row ends up as one of two shapes: a call detail record
//! or an SMS record. Column naming differences are resolved before these
//! types are built (see `ingest::normalizer`).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One decoded row: column header -> cell value.
pub type RawRow = HashMap<String, String>;

// ============================================================================
// RECORD KIND
// ============================================================================

/// Which canonical shape a file's rows normalize into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Call detail records
    Cdr,
    /// SMS records
    Sms,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Cdr => "cdr",
            RecordKind::Sms => "sms",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cdr" => Ok(RecordKind::Cdr),
            "sms" => Ok(RecordKind::Sms),
            other => Err(format!("Unknown record kind '{}', expected 'cdr' or 'sms'", other)),
        }
    }
}

// ============================================================================
// CALL RECORD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    #[default]
    Voice,
    Sms,
}

impl CallKind {
    /// Unknown values fall back to `Voice`.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "voice" => Some(CallKind::Voice),
            "sms" => Some(CallKind::Sms),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: String,
    pub from_number: String,
    pub to_number: String,
    /// Seconds
    pub duration: u64,
    pub timestamp: DateTime<Utc>,
    pub call_type: CallKind,
    pub location: Option<String>,
    pub imei: Option<String>,
}

// ============================================================================
// MESSAGE RECORD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Binary,
}

impl MessageKind {
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(MessageKind::Text),
            "binary" => Some(MessageKind::Binary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: String,
    pub from_number: String,
    pub to_number: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub message_type: MessageKind,
}

// ============================================================================
// CANONICAL RECORD
// ============================================================================

/// A normalized row, ready for classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CanonicalRecord {
    #[serde(rename = "cdr")]
    Call(CallRecord),
    #[serde(rename = "sms")]
    Message(MessageRecord),
}

impl CanonicalRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            CanonicalRecord::Call(_) => RecordKind::Cdr,
            CanonicalRecord::Message(_) => RecordKind::Sms,
        }
    }

    /// Call id or message id. Never empty.
    pub fn id(&self) -> &str {
        match self {
            CanonicalRecord::Call(c) => &c.call_id,
            CanonicalRecord::Message(m) => &m.message_id,
        }
    }

    /// Origin number, used as the verdict's source
    pub fn origin(&self) -> &str {
        match self {
            CanonicalRecord::Call(c) => &c.from_number,
            CanonicalRecord::Message(m) => &m.from_number,
        }
    }
}

/// Identifier for rows that carry none.
///
/// UUIDv7: millisecond clock in the high bits, random in the rest, so ids
/// stay unique inside a batch even when rows arrive within the same tick.
pub fn generate_record_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_parse() {
        assert_eq!("CDR".parse::<RecordKind>().unwrap(), RecordKind::Cdr);
        assert_eq!(" sms ".parse::<RecordKind>().unwrap(), RecordKind::Sms);
        assert!("mms".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: std::collections::HashSet<String> =
            (0..1000).map(|_| generate_record_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn test_canonical_record_serializes_with_kind_tag() {
        let record = CanonicalRecord::Message(MessageRecord {
            message_id: "m1".to_string(),
            from_number: "555-1".to_string(),
            to_number: "555-2".to_string(),
            message: "hi".to_string(),
            timestamp: Utc::now(),
            message_type: MessageKind::Text,
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "sms");
        assert_eq!(json["message_type"], "text");
        assert_eq!(record.origin(), "555-1");
        assert_eq!(record.id(), "m1");
    }
}

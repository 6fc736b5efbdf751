//! Schema Normalizer
//!
//! Maps a `RawRow` with arbitrary column names onto a canonical record.
//! Each field has an ordered alias list; the first alias present with a
//! non-empty value wins. Missing or unparsable cells never fail: they fall
//! back to the field default and are listed in the `NormalizationReport`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::models::{
    generate_record_id, CallKind, CallRecord, CanonicalRecord, MessageKind, MessageRecord, RawRow,
    RecordKind,
};

// ============================================================================
// COLUMN ALIASES
// ============================================================================

/// Column aliases for call detail records, in priority order
pub mod cdr {
    pub const CALL_ID: &[&str] = &["callId", "call_id"];
    pub const FROM_NUMBER: &[&str] = &["fromNumber", "from_number", "caller"];
    pub const TO_NUMBER: &[&str] = &["toNumber", "to_number", "callee"];
    pub const DURATION: &[&str] = &["duration", "call_duration"];
    pub const TIMESTAMP: &[&str] = &["timestamp", "call_time"];
    pub const CALL_TYPE: &[&str] = &["callType", "call_type"];
    pub const LOCATION: &[&str] = &["location", "cell_tower"];
    pub const IMEI: &[&str] = &["imei", "device_id"];
}

/// Column aliases for SMS records, in priority order
pub mod sms {
    pub const MESSAGE_ID: &[&str] = &["messageId", "message_id"];
    pub const FROM_NUMBER: &[&str] = &["fromNumber", "from_number", "sender"];
    pub const TO_NUMBER: &[&str] = &["toNumber", "to_number", "recipient"];
    pub const MESSAGE: &[&str] = &["message", "content", "text"];
    pub const TIMESTAMP: &[&str] = &["timestamp", "sent_time"];
    pub const MESSAGE_TYPE: &[&str] = &["messageType", "message_type"];
}

// ============================================================================
// QUALITY REPORT
// ============================================================================

/// Which fields fell back to a default while normalizing one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub defaulted: Vec<&'static str>,
}

impl NormalizationReport {
    pub fn is_degraded(&self) -> bool {
        !self.defaulted.is_empty()
    }

    fn mark(&mut self, field: &'static str) {
        self.defaulted.push(field);
    }
}

// ============================================================================
// NORMALIZE
// ============================================================================

/// Normalize one row into the canonical shape for `kind`.
pub fn normalize(row: &RawRow, kind: RecordKind) -> CanonicalRecord {
    normalize_with_report(row, kind, Utc::now()).0
}

/// Normalize with an explicit "now" (default timestamp) and report defaults.
pub fn normalize_with_report(
    row: &RawRow,
    kind: RecordKind,
    now: DateTime<Utc>,
) -> (CanonicalRecord, NormalizationReport) {
    let mut report = NormalizationReport::default();
    let record = match kind {
        RecordKind::Cdr => CanonicalRecord::Call(to_call_record(row, now, &mut report)),
        RecordKind::Sms => CanonicalRecord::Message(to_message_record(row, now, &mut report)),
    };
    (record, report)
}

fn to_call_record(row: &RawRow, now: DateTime<Utc>, report: &mut NormalizationReport) -> CallRecord {
    let call_id = lookup(row, cdr::CALL_ID).map(str::to_string).unwrap_or_else(|| {
        report.mark("call_id");
        generate_record_id()
    });

    let duration = match lookup(row, cdr::DURATION).and_then(parse_duration) {
        Some(d) => d,
        None => {
            report.mark("duration");
            0
        }
    };

    let call_type = match lookup(row, cdr::CALL_TYPE).and_then(CallKind::parse_lenient) {
        Some(k) => k,
        None => {
            report.mark("call_type");
            CallKind::default()
        }
    };

    CallRecord {
        call_id,
        from_number: text_field(row, cdr::FROM_NUMBER, "from_number", report),
        to_number: text_field(row, cdr::TO_NUMBER, "to_number", report),
        duration,
        timestamp: timestamp_field(row, cdr::TIMESTAMP, now, report),
        call_type,
        location: lookup(row, cdr::LOCATION).map(str::to_string),
        imei: lookup(row, cdr::IMEI).map(str::to_string),
    }
}

fn to_message_record(row: &RawRow, now: DateTime<Utc>, report: &mut NormalizationReport) -> MessageRecord {
    let message_id = lookup(row, sms::MESSAGE_ID).map(str::to_string).unwrap_or_else(|| {
        report.mark("message_id");
        generate_record_id()
    });

    let message_type = match lookup(row, sms::MESSAGE_TYPE).and_then(MessageKind::parse_lenient) {
        Some(k) => k,
        None => {
            report.mark("message_type");
            MessageKind::default()
        }
    };

    MessageRecord {
        message_id,
        from_number: text_field(row, sms::FROM_NUMBER, "from_number", report),
        to_number: text_field(row, sms::TO_NUMBER, "to_number", report),
        message: text_field(row, sms::MESSAGE, "message", report),
        timestamp: timestamp_field(row, sms::TIMESTAMP, now, report),
        message_type,
    }
}

/// First alias with a non-empty value. Empty cells count as absent.
fn lookup<'a>(row: &'a RawRow, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

fn text_field(row: &RawRow, aliases: &[&str], name: &'static str, report: &mut NormalizationReport) -> String {
    match lookup(row, aliases) {
        Some(v) => v.to_string(),
        None => {
            report.mark(name);
            String::new()
        }
    }
}

fn timestamp_field(
    row: &RawRow,
    aliases: &[&str],
    now: DateTime<Utc>,
    report: &mut NormalizationReport,
) -> DateTime<Utc> {
    match lookup(row, aliases).and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            report.mark("timestamp");
            now
        }
    }
}

// ============================================================================
// LENIENT PARSERS
// ============================================================================

/// Seconds from "30", "30.9", "30s". Negative values clamp to 0.
pub fn parse_duration(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<u64>() {
        return Some(n);
    }
    if let Ok(f) = value.parse::<f64>() {
        if f.is_finite() {
            return Some(f.max(0.0).trunc() as u64);
        }
        return None;
    }

    // Leading integer prefix
    let (negative, digits_from) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let digits: String = digits_from.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if negative {
        return Some(0);
    }
    digits.parse::<u64>().ok()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Epoch values above this are treated as milliseconds
const EPOCH_MILLIS_CUTOFF: i64 = 100_000_000_000;

/// Any reasonable point-in-time representation. Naive values are UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(value) {
        return Some(ts.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(epoch) = value.parse::<i64>() {
        return if epoch.abs() >= EPOCH_MILLIS_CUTOFF {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
    }

    None
}

//! Classification Rules & Thresholds
//!
//! Constants and tunable config only. Scoring logic lives in `engine`.

use serde::{Deserialize, Serialize};

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Scores below this are clean (no verdict)
pub const REPORT_MIN_SCORE: f64 = 2.0;

/// Upper bound of the risk scale
pub const MAX_RISK_SCORE: f64 = 10.0;

// ============================================================================
// CALL HEURISTICS
// ============================================================================

/// Calls at or below this many seconds count as "one ring" (wangiri)
pub const WANGIRI_MAX_DURATION_SECS: u64 = 3;

/// Calls to premium destinations longer than this look like revenue-share fraud
pub const IRSF_MIN_DURATION_SECS: u64 = 600;

/// Prefixes commonly abused for premium-rate / revenue-share fraud
pub const PREMIUM_PREFIXES: &[&str] = &[
    "+882", "+883", "+881", "+979", "+900", "+1900", "+1976", "00882", "00883", "+252", "+247",
    "+682", "+690", "+675", "+222", "+373",
];

pub const WANGIRI_SCORE: f64 = 5.5;
pub const IRSF_SCORE: f64 = 8.0;
pub const SPOOFING_SCORE: f64 = 7.5;
pub const ANONYMOUS_CALLER_SCORE: f64 = 2.5;

/// Bonus when a short call comes from a premium prefix
pub const PREMIUM_ORIGIN_BONUS: f64 = 2.5;

// ============================================================================
// MESSAGE HEURISTICS
// ============================================================================

pub const SMISHING_KEYWORDS: &[&str] = &[
    "verify", "account", "suspended", "password", "login", "bank", "otp", "pin", "locked",
    "confirm", "security alert", "unusual activity", "update your", "payment failed",
];

pub const URGENCY_KEYWORDS: &[&str] = &["urgent", "immediately", "within 24", "act now", "final notice", "expire"];

pub const SPAM_KEYWORDS: &[&str] = &[
    "winner", "won", "prize", "free", "congratulations", "claim", "offer", "discount", "lottery",
    "gift card", "unsubscribe",
];

pub const URL_SCORE: f64 = 3.0;
pub const SHORTENER_BONUS: f64 = 1.5;
pub const SMISHING_KEYWORD_WEIGHT: f64 = 1.5;
pub const URGENCY_KEYWORD_WEIGHT: f64 = 1.0;
pub const SPAM_KEYWORD_WEIGHT: f64 = 1.0;
pub const BINARY_PAYLOAD_SCORE: f64 = 7.0;

// ============================================================================
// CONFIGURABLE RULES
// ============================================================================

/// Tunable thresholds for the rule classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRules {
    /// Minimum score that produces a verdict
    pub report_min_score: f64,
    pub wangiri_max_duration_secs: u64,
    pub irsf_min_duration_secs: u64,
    /// Multiplies every computed score before clamping
    pub sensitivity: f64,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            report_min_score: REPORT_MIN_SCORE,
            wangiri_max_duration_secs: WANGIRI_MAX_DURATION_SECS,
            irsf_min_duration_secs: IRSF_MIN_DURATION_SECS,
            sensitivity: 1.0,
        }
    }
}

impl ClassifierRules {
    /// More verdicts, lower bar
    pub fn high_sensitivity() -> Self {
        Self {
            report_min_score: 1.0,
            wangiri_max_duration_secs: 5,
            irsf_min_duration_secs: 300,
            sensitivity: 1.2,
        }
    }

    /// Fewer verdicts
    pub fn low_sensitivity() -> Self {
        Self {
            report_min_score: 4.0,
            wangiri_max_duration_secs: 2,
            irsf_min_duration_secs: 1200,
            sensitivity: 0.8,
        }
    }
}

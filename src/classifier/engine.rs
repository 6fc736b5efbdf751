//! Rule Classifier
//!
//! Deterministic and explainable: every point added to a score comes with a
//! reason string. Input: `CanonicalRecord`. Output: `Option<Verdict>`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::rules::*;
use super::{ClassificationError, Classifier};
use crate::models::{CallKind, CallRecord, CanonicalRecord, MessageKind, MessageRecord, Verdict};

fn keyword_regex(words: &[&str]) -> Regex {
    let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).unwrap()
}

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)\S+|\b[a-z0-9-]+\.(?:com|net|org|info|xyz|top|ly|co|io|link|click|site)(?:/\S*)?\b").unwrap()
});

static SHORTENER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:bit\.ly|tinyurl\.com|t\.co|goo\.gl|is\.gd|cutt\.ly|ow\.ly|rb\.gy)\b").unwrap()
});

static SMISHING_REGEX: Lazy<Regex> = Lazy::new(|| keyword_regex(SMISHING_KEYWORDS));
static URGENCY_REGEX: Lazy<Regex> = Lazy::new(|| keyword_regex(URGENCY_KEYWORDS));
static SPAM_REGEX: Lazy<Regex> = Lazy::new(|| keyword_regex(SPAM_KEYWORDS));

/// Intermediate result: category, raw score, reasons
#[derive(Debug, Clone, Default)]
struct Assessment {
    threat_type: &'static str,
    score: f64,
    reasons: Vec<String>,
}

impl Assessment {
    /// Keep the stronger of two candidate assessments
    fn max(self, other: Assessment) -> Assessment {
        if other.score > self.score {
            other
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    rules: ClassifierRules,
}

impl RuleClassifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    /// Synchronous scoring, shared by the trait impl and tests
    pub fn assess(&self, record: &CanonicalRecord) -> Option<Verdict> {
        let assessment = match record {
            CanonicalRecord::Call(call) => self.assess_call(call),
            CanonicalRecord::Message(msg) => self.assess_message(msg),
        };

        let score = (assessment.score * self.rules.sensitivity).clamp(0.0, MAX_RISK_SCORE);
        if score < self.rules.report_min_score {
            return None;
        }

        let mut reasons = assessment.reasons;
        reasons.push(format!("Final score: {:.1}", score));
        Some(Verdict::for_record(record, assessment.threat_type, score).with_reasons(reasons))
    }

    fn assess_call(&self, call: &CallRecord) -> Assessment {
        let mut best = Assessment::default();
        let premium_origin = is_premium(&call.from_number);
        let premium_destination = is_premium(&call.to_number);

        // One-ring callback bait
        if call.call_type == CallKind::Voice && call.duration <= self.rules.wangiri_max_duration_secs && !call.from_number.is_empty() {
            let mut a = Assessment {
                threat_type: "wangiri",
                score: WANGIRI_SCORE,
                reasons: vec![format!("Call lasted {}s", call.duration)],
            };
            if premium_origin {
                a.score += PREMIUM_ORIGIN_BONUS;
                a.reasons.push(format!("Premium-rate origin {}", call.from_number));
            }
            best = best.max(a);
        }

        // Revenue share fraud
        if premium_destination && call.duration >= self.rules.irsf_min_duration_secs {
            best = best.max(Assessment {
                threat_type: "irsf",
                score: IRSF_SCORE,
                reasons: vec![format!(
                    "{}s call to premium-rate destination {}",
                    call.duration, call.to_number
                )],
            });
        }

        if !call.from_number.is_empty() && call.from_number == call.to_number {
            best = best.max(Assessment {
                threat_type: "spoofing",
                score: SPOOFING_SCORE,
                reasons: vec!["Origin equals destination".to_string()],
            });
        } else if !call.from_number.is_empty() && !is_dialable(&call.from_number) {
            best = best.max(Assessment {
                threat_type: "spoofing",
                score: SPOOFING_SCORE - 1.5,
                reasons: vec![format!("Non-dialable caller id '{}'", call.from_number)],
            });
        }

        if call.from_number.is_empty() {
            best = best.max(Assessment {
                threat_type: "anonymous_caller",
                score: ANONYMOUS_CALLER_SCORE,
                reasons: vec!["Caller id withheld".to_string()],
            });
        }

        best
    }

    fn assess_message(&self, msg: &MessageRecord) -> Assessment {
        if msg.message_type == MessageKind::Binary {
            return Assessment {
                threat_type: "binary_payload",
                score: BINARY_PAYLOAD_SCORE,
                reasons: vec!["Binary SMS payload".to_string()],
            };
        }

        let body = msg.message.as_str();
        let has_url = URL_REGEX.is_match(body);
        let smishing_hits = distinct_matches(&SMISHING_REGEX, body);
        let urgency_hits = distinct_matches(&URGENCY_REGEX, body);
        let spam_hits = distinct_matches(&SPAM_REGEX, body);

        let mut smishing = Assessment {
            threat_type: "smishing",
            ..Default::default()
        };
        if has_url {
            smishing.score += URL_SCORE;
            smishing.reasons.push("Message contains a link".to_string());
            if SHORTENER_REGEX.is_match(body) {
                smishing.score += SHORTENER_BONUS;
                smishing.reasons.push("Link uses a URL shortener".to_string());
            }
        }
        if smishing_hits > 0 {
            smishing.score += smishing_hits as f64 * SMISHING_KEYWORD_WEIGHT;
            smishing.reasons.push(format!("{} credential/account keywords", smishing_hits));
        }
        if urgency_hits > 0 {
            smishing.score += urgency_hits as f64 * URGENCY_KEYWORD_WEIGHT;
            smishing.reasons.push(format!("{} urgency keywords", urgency_hits));
        }
        // Keywords alone without a link or account lure are not phishing
        if !has_url && smishing_hits == 0 {
            smishing.score = 0.0;
        }

        let mut spam = Assessment {
            threat_type: "spam",
            ..Default::default()
        };
        if spam_hits > 0 {
            spam.score = spam_hits as f64 * SPAM_KEYWORD_WEIGHT + if has_url { 1.0 } else { 0.0 };
            spam.reasons.push(format!("{} promotional keywords", spam_hits));
        }

        smishing.max(spam)
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(&self, record: &CanonicalRecord) -> Result<Option<Verdict>, ClassificationError> {
        Ok(self.assess(record))
    }
}

fn distinct_matches(re: &Regex, text: &str) -> usize {
    let mut seen: Vec<String> = re.find_iter(text).map(|m| m.as_str().to_ascii_lowercase()).collect();
    seen.sort();
    seen.dedup();
    seen.len()
}

fn is_premium(number: &str) -> bool {
    let compact: String = number.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    PREMIUM_PREFIXES.iter().any(|p| compact.starts_with(p))
}

fn is_dialable(number: &str) -> bool {
    number
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'))
}

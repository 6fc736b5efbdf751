use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::classifier::{ClassificationError, Classifier, RuleClassifier};
use crate::models::{CanonicalRecord, RecordKind, Verdict};
use crate::store::{MemoryVerdictStore, StoreError, VerdictStore};

// ============================================================================
// TEST DOUBLES
// ============================================================================

#[derive(Clone)]
enum Script {
    Threat(&'static str, f64),
    /// Threat attributed to some other number
    Misattributed(&'static str),
    Fail,
    Slow(Duration),
}

/// Outcomes keyed by origin number. Unlisted origins are clean.
#[derive(Default)]
struct ScriptedClassifier {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    fn with(mut self, origin: &str, script: Script) -> Self {
        self.scripts.insert(origin.to_string(), script);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, record: &CanonicalRecord) -> Result<Option<Verdict>, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(record.origin()).cloned() {
            Some(Script::Threat(category, score)) => Ok(Some(Verdict::for_record(record, category, score))),
            Some(Script::Misattributed(other)) => {
                let mut verdict = Verdict::for_record(record, "spoofing", 6.0);
                verdict.source = other.to_string();
                Ok(Some(verdict))
            }
            Some(Script::Fail) => Err(ClassificationError::Malformed("bad model output".to_string())),
            Some(Script::Slow(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Some(Verdict::for_record(record, "slow", 1.0)))
            }
            None => Ok(None),
        }
    }
}

/// Store whose writes always fail
struct BrokenStore;

#[async_trait]
impl VerdictStore for BrokenStore {
    async fn put(&self, _verdict: &Verdict) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn recent(&self, _limit: usize, _offset: usize) -> Result<Vec<Verdict>, StoreError> {
        Ok(vec![])
    }

    async fn by_source(&self, _source: &str, _limit: usize) -> Result<Vec<Verdict>, StoreError> {
        Ok(vec![])
    }
}

/// Store that accepts writes but never returns them
struct BlackholeStore;

#[async_trait]
impl VerdictStore for BlackholeStore {
    async fn put(&self, _verdict: &Verdict) -> Result<(), StoreError> {
        Ok(())
    }

    async fn recent(&self, _limit: usize, _offset: usize) -> Result<Vec<Verdict>, StoreError> {
        Ok(vec![])
    }

    async fn by_source(&self, _source: &str, _limit: usize) -> Result<Vec<Verdict>, StoreError> {
        Ok(vec![])
    }
}

fn pipeline_with(
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn VerdictStore>,
    config: OrchestratorConfig,
    options: IngestOptions,
) -> IngestionPipeline {
    let orchestrator = Orchestrator::new(classifier, store, config);
    IngestionPipeline::new(orchestrator, RiskPolicy::default(), options)
}

fn pipeline(classifier: Arc<dyn Classifier>, store: Arc<dyn VerdictStore>) -> IngestionPipeline {
    pipeline_with(classifier, store, OrchestratorConfig::default(), IngestOptions::default())
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn test_single_high_risk_threat() {
    let classifier = Arc::new(ScriptedClassifier::default().with("555-1", Script::Threat("smishing", 8.5)));
    let store = Arc::new(MemoryVerdictStore::new());
    let p = pipeline(classifier, store.clone());

    let summary = p
        .run(b"from_number,to_number,duration\n555-1,555-2,30\n", RecordKind::Cdr)
        .await
        .unwrap();

    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.threats_detected, 1);
    assert_eq!(summary.high_risk_records, 1);
    assert!((summary.average_risk_score - 8.5).abs() < 1e-9);
    assert_eq!(summary.threats_by_type.len(), 1);
    assert_eq!(summary.threats_by_type["smishing"], 1);

    // Persisted with the origin as source
    let stored = store.by_source("555-1", 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].threat_type, "smishing");
}

#[tokio::test]
async fn test_failed_classification_counts_only_toward_total() {
    let classifier = Arc::new(
        ScriptedClassifier::default()
            .with("555-1", Script::Fail)
            .with("555-3", Script::Threat("spam", 3.0)),
    );
    let p = pipeline(classifier, Arc::new(MemoryVerdictStore::new()));

    let summary = p
        .run(b"from_number,to_number\n555-1,555-2\n555-3,555-4\n", RecordKind::Sms)
        .await
        .unwrap();

    assert_eq!(summary.total_records, 2);
    assert_eq!(summary.threats_detected, 1);
    assert_eq!(summary.high_risk_records, 0);
    assert!((summary.average_risk_score - 3.0).abs() < 1e-9);
    assert_eq!(summary.classification_failures, 1);
}

#[tokio::test]
async fn test_header_only_file() {
    let classifier = Arc::new(ScriptedClassifier::default());
    let p = pipeline(classifier.clone(), Arc::new(MemoryVerdictStore::new()));

    let summary = p.run(b"from_number,to_number,duration\n", RecordKind::Cdr).await.unwrap();

    assert_eq!(summary.total_records, 0);
    assert_eq!(summary.threats_detected, 0);
    assert_eq!(summary.average_risk_score, 0.0);
    assert!(summary.threats_by_type.is_empty());
    assert_eq!(classifier.calls(), 0);
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[tokio::test]
async fn test_total_count_ignores_failures() {
    let classifier = Arc::new(
        ScriptedClassifier::default()
            .with("1", Script::Fail)
            .with("2", Script::Fail)
            .with("3", Script::Threat("wangiri", 7.0))
            .with("4", Script::Threat("wangiri", 9.0))
            .with("5", Script::Threat("irsf", 2.0)),
    );
    let p = pipeline(classifier.clone(), Arc::new(MemoryVerdictStore::new()));

    let mut file = String::from("caller,callee,duration\n");
    for origin in 1..=7 {
        file.push_str(&format!("{},999,{}\n", origin, origin * 10));
    }

    let summary = p.run(file.as_bytes(), RecordKind::Cdr).await.unwrap();

    assert_eq!(summary.total_records, 7);
    assert_eq!(classifier.calls(), 7);
    assert!(summary.threats_detected <= summary.total_records);
    assert!(summary.high_risk_records <= summary.threats_detected);
    assert_eq!(summary.threats_detected, 3);
    assert_eq!(summary.high_risk_records, 2);
    assert!((summary.average_risk_score - 6.0).abs() < 1e-9);
    assert_eq!(summary.threats_by_type.values().sum::<u64>(), summary.threats_detected);
}

#[tokio::test]
async fn test_inconsistent_columns_fail_the_run() {
    let classifier = Arc::new(ScriptedClassifier::default().with("555-1", Script::Threat("spam", 4.0)));
    let p = pipeline(classifier, Arc::new(MemoryVerdictStore::new()));
    let file = b"from_number,to_number\n555-1,555-2\n555-3\n555-5,555-6\n";

    let err = p.run(file, RecordKind::Sms).await.unwrap_err();
    assert!(matches!(err, IngestError::Decode(DecodeError::ColumnCount { line: 3, .. })));

    // Lenient mode keeps what was processed before the bad line
    let partial = p.run_partial(file, RecordKind::Sms).await;
    assert_eq!(partial.state, RunState::Failed);
    assert!(partial.decode_error.is_some());
    assert_eq!(partial.summary.total_records, 1);
    assert_eq!(partial.summary.threats_detected, 1);
}

#[tokio::test]
async fn test_clean_run_reports_finalized() {
    let p = pipeline(Arc::new(ScriptedClassifier::default()), Arc::new(MemoryVerdictStore::new()));
    let partial = p.run_partial(b"sender,text\n555-1,hello\n", RecordKind::Sms).await;
    assert_eq!(partial.state, RunState::Finalized);
    assert!(partial.decode_error.is_none());
    assert_eq!(partial.summary.total_records, 1);
}

// ============================================================================
// ORCHESTRATION
// ============================================================================

#[tokio::test]
async fn test_classifier_timeout_is_a_failure() {
    let classifier = Arc::new(ScriptedClassifier::default().with("555-1", Script::Slow(Duration::from_millis(500))));
    let config = OrchestratorConfig {
        classifier_timeout: Duration::from_millis(20),
        ..Default::default()
    };
    let p = pipeline_with(classifier, Arc::new(MemoryVerdictStore::new()), config, IngestOptions::default());

    let summary = p.run(b"sender\n555-1\n", RecordKind::Sms).await.unwrap();
    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.threats_detected, 0);
    assert_eq!(summary.classification_failures, 1);
}

#[tokio::test]
async fn test_store_failure_still_counts_direct_verdict() {
    let classifier = Arc::new(ScriptedClassifier::default().with("555-1", Script::Threat("spam", 5.0)));
    let p = pipeline(classifier, Arc::new(BrokenStore));

    let summary = p.run(b"sender\n555-1\n", RecordKind::Sms).await.unwrap();
    assert_eq!(summary.threats_detected, 1);
    assert_eq!(summary.store_failures, 1);
}

#[tokio::test]
async fn test_recent_window_correlation() {
    let classifier = Arc::new(
        ScriptedClassifier::default()
            .with("555-1", Script::Threat("smishing", 8.0))
            .with("555-3", Script::Threat("spam", 3.0)),
    );
    let store = Arc::new(MemoryVerdictStore::new());
    let config = OrchestratorConfig {
        correlation: CorrelationMode::RecentWindow { window: DEFAULT_CORRELATION_WINDOW },
        ..Default::default()
    };
    let p = pipeline_with(classifier, store.clone(), config, IngestOptions::default());

    let summary = p
        .run(b"sender,text\n555-1,a\n555-2,b\n555-3,c\n", RecordKind::Sms)
        .await
        .unwrap();

    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.threats_detected, 2);
    assert_eq!(summary.high_risk_records, 1);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_recent_window_miss() {
    let classifier = Arc::new(ScriptedClassifier::default().with("555-1", Script::Threat("spam", 5.0)));
    let config = OrchestratorConfig {
        correlation: CorrelationMode::RecentWindow { window: 10 },
        ..Default::default()
    };
    let p = pipeline_with(classifier, Arc::new(BlackholeStore), config, IngestOptions::default());

    let summary = p.run(b"sender\n555-1\n", RecordKind::Sms).await.unwrap();
    assert_eq!(summary.threats_detected, 0);
    assert_eq!(summary.correlation_misses, 1);
}

#[tokio::test]
async fn test_recent_window_store_failure_yields_no_verdict() {
    let classifier = Arc::new(ScriptedClassifier::default().with("555-1", Script::Threat("spam", 5.0)));
    let config = OrchestratorConfig {
        correlation: CorrelationMode::RecentWindow { window: 10 },
        ..Default::default()
    };
    let p = pipeline_with(classifier, Arc::new(BrokenStore), config, IngestOptions::default());

    let summary = p.run(b"sender\n555-1\n", RecordKind::Sms).await.unwrap();
    assert_eq!(summary.threats_detected, 0);
    assert_eq!(summary.store_failures, 1);
}

#[tokio::test]
async fn test_process_record_directly() {
    let classifier = Arc::new(ScriptedClassifier::default().with("555-1", Script::Threat("wangiri", 6.0)));
    let orchestrator = Orchestrator::new(classifier, Arc::new(MemoryVerdictStore::new()), OrchestratorConfig::default());

    let row: crate::models::RawRow = [("caller".to_string(), "555-1".to_string())].into_iter().collect();
    let record = normalize(&row, RecordKind::Cdr);
    let verdict = orchestrator.process_record(&record).await.into_verdict().unwrap();
    assert_eq!(verdict.source, "555-1");
    assert_eq!(verdict.record_id, record.id());

    let other: crate::models::RawRow = [("caller".to_string(), "555-9".to_string())].into_iter().collect();
    let outcome = orchestrator.process_record(&normalize(&other, RecordKind::Cdr)).await;
    assert!(outcome.verdict.is_none());
    assert!(outcome.error.is_none());
}

// ============================================================================
// OPTIONS
// ============================================================================

#[tokio::test]
async fn test_max_records_stops_at_row_boundary() {
    let classifier = Arc::new(ScriptedClassifier::default());
    let options = IngestOptions {
        max_records: Some(2),
        ..Default::default()
    };
    let p = pipeline_with(classifier.clone(), Arc::new(MemoryVerdictStore::new()), OrchestratorConfig::default(), options);

    let summary = p.run(b"sender\n1\n2\n3\n4\n", RecordKind::Sms).await.unwrap();
    assert_eq!(summary.total_records, 2);
    assert_eq!(classifier.calls(), 2);
}

#[tokio::test]
async fn test_file_at_exact_record_limit_is_finalized() {
    let classifier = Arc::new(ScriptedClassifier::default());
    let options = IngestOptions {
        max_records: Some(2),
        ..Default::default()
    };
    let p = pipeline_with(classifier.clone(), Arc::new(MemoryVerdictStore::new()), OrchestratorConfig::default(), options);

    let run = p.run_partial(b"sender\n1\n2\n", RecordKind::Sms).await;
    assert_eq!(run.state, RunState::Finalized);
    assert_eq!(run.summary.total_records, 2);
    assert_eq!(classifier.calls(), 2);

    // Rows past the cap are never classified, even malformed ones
    let summary = p.run(b"sender,text\n1,a\n2,b\n3\n", RecordKind::Sms).await.unwrap();
    assert_eq!(summary.total_records, 2);
    assert_eq!(classifier.calls(), 4);
}

#[tokio::test]
async fn test_degraded_records_are_counted() {
    let p = pipeline(Arc::new(ScriptedClassifier::default()), Arc::new(MemoryVerdictStore::new()));
    let summary = p
        .run(b"call_id,caller,callee,duration,timestamp,call_type\nc1,1,2,30,2024-01-01T00:00:00Z,voice\nc2,1,2,oops,2024-01-01T00:00:00Z,voice\n", RecordKind::Cdr)
        .await
        .unwrap();
    assert_eq!(summary.total_records, 2);
    assert_eq!(summary.degraded_records, 1);
}

#[tokio::test]
async fn test_rule_classifier_end_to_end() {
    let store = Arc::new(MemoryVerdictStore::new());
    let p = pipeline(Arc::new(RuleClassifier::default()), store.clone());
    let file = "sender,recipient,content\n\
                BANK,555-1,\"URGENT: your account is suspended, verify at http://bit.ly/x1\"\n\
                555-7,555-1,See you at dinner\n\
                PROMO,555-1,\"Congratulations winner, claim your prize\"\n";

    let summary = p.run(file.as_bytes(), RecordKind::Sms).await.unwrap();
    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.threats_detected, 2);
    assert_eq!(summary.high_risk_records, 1);
    assert_eq!(summary.threats_by_type["smishing"], 1);
    assert_eq!(summary.threats_by_type["spam"], 1);
    assert_eq!(store.len(), 2);
}

// ============================================================================
// CLASSIFIER OUTPUT CHECKS
// ============================================================================

#[tokio::test]
async fn test_non_finite_score_is_a_classification_failure() {
    let classifier = Arc::new(
        ScriptedClassifier::default()
            .with("555-1", Script::Threat("spam", f64::NAN))
            .with("555-5", Script::Threat("spam", f64::INFINITY))
            .with("555-3", Script::Threat("spam", 3.0)),
    );
    let store = Arc::new(MemoryVerdictStore::new());
    let p = pipeline(classifier, store.clone());

    let summary = p
        .run(b"from_number,to_number\n555-1,555-2\n555-3,555-4\n555-5,555-6\n", RecordKind::Sms)
        .await
        .unwrap();

    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.threats_detected, 1);
    assert_eq!(summary.classification_failures, 2);
    assert!((summary.average_risk_score - 3.0).abs() < 1e-9);
    assert_eq!(store.len(), 1);

    let json = serde_json::to_value(&summary).unwrap();
    let back: crate::models::Summary = serde_json::from_value(json).unwrap();
    assert_eq!(back.threats_detected, 1);
}

#[tokio::test]
async fn test_out_of_range_score_is_rejected() {
    let classifier = Arc::new(
        ScriptedClassifier::default()
            .with("555-1", Script::Threat("spam", 11.0))
            .with("555-3", Script::Threat("spam", -0.5)),
    );
    let p = pipeline(classifier, Arc::new(MemoryVerdictStore::new()));

    let summary = p
        .run(b"from_number,to_number\n555-1,555-2\n555-3,555-4\n", RecordKind::Sms)
        .await
        .unwrap();

    assert_eq!(summary.threats_detected, 0);
    assert_eq!(summary.classification_failures, 2);
    assert_eq!(summary.average_risk_score, 0.0);
}

#[tokio::test]
async fn test_verdict_source_is_record_origin() {
    let classifier = Arc::new(ScriptedClassifier::default().with("555-1", Script::Misattributed("999-9")));
    let store = Arc::new(MemoryVerdictStore::new());
    let p = pipeline(classifier, store.clone());

    p.run(b"from_number,to_number\n555-1,555-2\n", RecordKind::Cdr).await.unwrap();

    assert_eq!(store.by_source("555-1", 10).await.unwrap().len(), 1);
    assert!(store.by_source("999-9", 10).await.unwrap().is_empty());
}

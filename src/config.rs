//! Configuration module

use std::env;
use std::time::Duration;

use crate::ingest::{
    CorrelationMode, IngestOptions, OrchestratorConfig, RiskPolicy, DEFAULT_CLASSIFIER_TIMEOUT_MS,
    DEFAULT_CORRELATION_WINDOW, DEFAULT_DELIMITER, DEFAULT_HIGH_RISK_THRESHOLD,
};

/// Default upload size limit (25 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Verdicts kept by the in-memory store before the oldest are dropped
pub const DEFAULT_MEMORY_STORE_CAPACITY: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (required for the postgres backend)
    pub database_url: Option<String>,

    pub store_backend: StoreBackend,

    pub memory_store_capacity: usize,

    /// Server port
    pub port: u16,

    /// Verdicts at or above this score are high risk
    pub high_risk_threshold: f64,

    /// Per-record classifier budget in milliseconds
    pub classifier_timeout_ms: u64,

    pub correlation: CorrelationMode,

    pub max_upload_bytes: usize,

    /// Row cap per ingestion run
    pub max_records: Option<usize>,

    pub csv_delimiter: char,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());

        let store_backend = match env::var("STORE_BACKEND").ok().as_deref() {
            Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            _ if database_url.is_some() => StoreBackend::Postgres,
            _ => StoreBackend::Memory,
        };

        let correlation = match env::var("CORRELATION_MODE").ok().as_deref() {
            Some("recent_window") => CorrelationMode::RecentWindow {
                window: parse_var("CORRELATION_WINDOW").unwrap_or(DEFAULT_CORRELATION_WINDOW),
            },
            _ => CorrelationMode::Direct,
        };

        Self {
            database_url,
            store_backend,

            memory_store_capacity: parse_var("MEMORY_STORE_CAPACITY")
                .filter(|&c| c > 0)
                .unwrap_or(DEFAULT_MEMORY_STORE_CAPACITY),

            port: parse_var("PORT").unwrap_or(8080),

            high_risk_threshold: parse_var("HIGH_RISK_THRESHOLD").unwrap_or(DEFAULT_HIGH_RISK_THRESHOLD),

            classifier_timeout_ms: parse_var("CLASSIFIER_TIMEOUT_MS").unwrap_or(DEFAULT_CLASSIFIER_TIMEOUT_MS),

            correlation,

            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),

            max_records: parse_var("MAX_RECORDS"),

            csv_delimiter: env::var("CSV_DELIMITER")
                .ok()
                .and_then(|d| d.chars().next())
                .unwrap_or(DEFAULT_DELIMITER),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn risk_policy(&self) -> RiskPolicy {
        RiskPolicy {
            high_risk_threshold: self.high_risk_threshold,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            classifier_timeout: Duration::from_millis(self.classifier_timeout_ms),
            correlation: self.correlation,
        }
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            max_records: self.max_records,
            delimiter: self.csv_delimiter,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            store_backend: StoreBackend::Memory,
            memory_store_capacity: DEFAULT_MEMORY_STORE_CAPACITY,
            port: 8080,
            high_risk_threshold: DEFAULT_HIGH_RISK_THRESHOLD,
            classifier_timeout_ms: DEFAULT_CLASSIFIER_TIMEOUT_MS,
            correlation: CorrelationMode::Direct,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_records: None,
            csv_delimiter: DEFAULT_DELIMITER,
            environment: "development".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

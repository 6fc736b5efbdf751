use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{StoreError, VerdictStore};
use crate::models::Verdict;

/// In-memory store. Front of the deque is the newest verdict.
#[derive(Debug, Default)]
pub struct MemoryVerdictStore {
    verdicts: RwLock<VecDeque<Verdict>>,
    /// Oldest entries are dropped past this size (None = unbounded)
    capacity: Option<usize>,
}

impl MemoryVerdictStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            verdicts: RwLock::new(VecDeque::new()),
            capacity: Some(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.verdicts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.read().is_empty()
    }
}

#[async_trait]
impl VerdictStore for MemoryVerdictStore {
    async fn put(&self, verdict: &Verdict) -> Result<(), StoreError> {
        let mut guard = self.verdicts.write();
        guard.push_front(verdict.clone());
        if let Some(cap) = self.capacity {
            guard.truncate(cap);
        }
        Ok(())
    }

    async fn recent(&self, limit: usize, offset: usize) -> Result<Vec<Verdict>, StoreError> {
        let guard = self.verdicts.read();
        Ok(guard.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn by_source(&self, source: &str, limit: usize) -> Result<Vec<Verdict>, StoreError> {
        let guard = self.verdicts.read();
        Ok(guard
            .iter()
            .filter(|v| v.source == source)
            .take(limit)
            .cloned()
            .collect())
    }
}

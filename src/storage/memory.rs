//! In-memory learner storage for testing.

use std::sync::RwLock;

use crate::error::Result;
use crate::storage::{LearnerRecord, LearnerStore};

/// In-memory learner store.
///
/// The record lives behind an `RwLock` and is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryLearnerStore {
    record: RwLock<Option<LearnerRecord>>,
}

impl MemoryLearnerStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `record`.
    pub fn with_record(record: LearnerRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.record.read().map(|r| r.is_none()).unwrap_or(true)
    }
}

impl LearnerStore for MemoryLearnerStore {
    fn load(&self) -> Result<Option<LearnerRecord>> {
        let record = self.record.read().unwrap_or_else(|e| e.into_inner());
        Ok(record.clone())
    }

    fn save(&self, record: &LearnerRecord) -> Result<()> {
        let mut slot = self.record.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.record.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        Ok(())
    }
}

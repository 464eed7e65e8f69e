//! Learner storage traits for Pathway.
//!
//! This module defines the `LearnerStore` trait for record persistence.

use std::sync::Arc;

use crate::error::Result;
use crate::storage::LearnerRecord;

/// Trait for learner record storage backends.
///
/// A store holds a single learner's record.
pub trait LearnerStore: Send + Sync {
    /// Load the record.
    ///
    /// Returns `Ok(None)` if nothing has been saved yet.
    fn load(&self) -> Result<Option<LearnerRecord>>;

    /// Save the record, replacing any previous one.
    fn save(&self, record: &LearnerRecord) -> Result<()>;

    /// Remove the record.
    ///
    /// Returns `Ok(())` even if nothing was saved.
    fn clear(&self) -> Result<()>;

    /// Check if a record exists.
    fn exists(&self) -> Result<bool> {
        Ok(self.load()?.is_some())
    }
}

/// Blanket implementation of LearnerStore for Arc-wrapped stores.
///
/// This allows sharing one store between tests and commands.
impl<T: LearnerStore + ?Sized> LearnerStore for Arc<T> {
    fn load(&self) -> Result<Option<LearnerRecord>> {
        (**self).load()
    }

    fn save(&self, record: &LearnerRecord) -> Result<()> {
        (**self).save(record)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

//! Learner record storage for Pathway.
//!
//! This module provides persistence for the learner record,
//! supporting file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod record;
pub mod traits;

pub use file::FileLearnerStore;
pub use memory::MemoryLearnerStore;
pub use record::{LearnerRecord, RewardLedgerEntry, StreakState, RECORD_SCHEMA_VERSION};
pub use traits::LearnerStore;

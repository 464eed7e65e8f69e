//! Pathway - Adaptive Learning Progression & Assessment Engine
//!
//! Pathway derives module locks, progress, and next-lesson recommendations
//! from a content catalog and a learner's completed lessons, and runs timed
//! daily challenges that pay out XP with a streak bonus.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;

pub use config::Config;
pub use core::{
    compute_reward, Catalog, ChallengeSession, DailyChallenge, Engine, EngineState, Intent,
    Module, PathView, Progression, Recommender, RewardOutcome, SessionPhase, SessionView,
};
pub use error::{PathwayError, Result};
pub use storage::{FileLearnerStore, LearnerRecord, LearnerStore, MemoryLearnerStore};

// CLI commands
pub use cli::{ChallengeCommand, CompleteCommand, PathCommand};

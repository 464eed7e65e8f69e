//! Core types and logic for Pathway.
//!
//! This module contains the content catalog, the progression rules that
//! derive locks and progress from completed lessons, the challenge session
//! state machine, reward computation, and the intent-driven engine that
//! ties them together.

pub mod catalog;
pub mod engine;
pub mod progression;
pub mod recommend;
pub mod reward;
pub mod session;

pub use catalog::{
    Catalog, Category, ChallengeQuestion, DailyChallenge, Difficulty, Lesson, LessonType, Module,
    QuestionType,
};
pub use engine::{Engine, EngineSettings, EngineState, Intent};
pub use progression::{
    complete_lesson, compute_lock_state, compute_module_progress, compute_overall_progress,
    LessonView, LockState, ModuleStatus, ModuleView, PathView, Progression, Recommendation,
};
pub use recommend::{FirstUnlockedRecommender, FlaggedRecommender, Recommender};
pub use reward::{compute_reward, RewardOutcome, RewardPolicy, DEFAULT_STREAK_THRESHOLD};
pub use session::{
    start_session, Assessment, ChallengeSession, QuestionResult, QuestionView, SessionPhase,
    SessionView,
};

//! Unified error types for Pathway.
//!
//! Engine errors are caller errors (stale ids, out-of-order intents) and are
//! always surfaced. The one exception is [`PathwayError::GraphCycle`], which
//! is a warning: the engine keeps serving a degraded result instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Pathway operations.
#[derive(Error, Debug)]
pub enum PathwayError {
    /// No lesson with this id exists in the catalog.
    #[error("unknown lesson: {lesson_id}")]
    UnknownLesson { lesson_id: String },

    /// No challenge with this id exists in the catalog.
    #[error("unknown challenge: {challenge_id}")]
    UnknownChallenge { challenge_id: String },

    /// A session intent arrived in a phase that does not accept it.
    #[error("cannot {action} while session is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: &'static str,
    },

    /// The selected option does not exist on the current question.
    #[error("option index {index} out of range (question has {len} options)")]
    InvalidOptionIndex { index: usize, len: usize },

    /// Submit was called before any answer was selected.
    #[error("no answer selected for question {question_id}")]
    NoAnswerSelected { question_id: String },

    /// A challenge without questions cannot be started.
    #[error("challenge {challenge_id} has no questions")]
    EmptyChallenge { challenge_id: String },

    /// Prerequisite cycle detected. Warning-level: affected modules stay locked.
    #[error("prerequisite cycle detected among modules: {}", modules.join(", "))]
    GraphCycle { modules: Vec<String> },

    /// Answer intents need an active session.
    #[error("no active challenge session")]
    NoActiveSession,

    /// The session's cursor points past the challenge's questions.
    #[error("session for challenge {challenge_id} is at question {question_cursor}, which no longer exists")]
    StaleSession {
        challenge_id: String,
        question_cursor: usize,
    },

    /// Lesson completion refused because lesson order is enforced.
    #[error("lesson {lesson_id} is locked")]
    LessonLocked { lesson_id: String },

    /// Content snapshot failed validation.
    #[error("invalid catalog: {message}")]
    InvalidCatalog { message: String },

    /// I/O errors from record or catalog files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for Pathway operations.
pub type Result<T> = std::result::Result<T, PathwayError>;

impl PathwayError {
    /// Create an unknown lesson error.
    pub fn unknown_lesson(lesson_id: impl Into<String>) -> Self {
        Self::UnknownLesson {
            lesson_id: lesson_id.into(),
        }
    }

    /// Create an unknown challenge error.
    pub fn unknown_challenge(challenge_id: impl Into<String>) -> Self {
        Self::UnknownChallenge {
            challenge_id: challenge_id.into(),
        }
    }

    /// Create an invalid phase error.
    pub fn invalid_phase(action: &'static str, phase: &'static str) -> Self {
        Self::InvalidPhase { action, phase }
    }

    /// Create a no-answer-selected error.
    pub fn no_answer_selected(question_id: impl Into<String>) -> Self {
        Self::NoAnswerSelected {
            question_id: question_id.into(),
        }
    }

    /// Create an empty challenge error.
    pub fn empty_challenge(challenge_id: impl Into<String>) -> Self {
        Self::EmptyChallenge {
            challenge_id: challenge_id.into(),
        }
    }

    /// Create a stale session error.
    pub fn stale_session(challenge_id: impl Into<String>, question_cursor: usize) -> Self {
        Self::StaleSession {
            challenge_id: challenge_id.into(),
            question_cursor,
        }
    }

    /// Create a lesson locked error.
    pub fn lesson_locked(lesson_id: impl Into<String>) -> Self {
        Self::LessonLocked {
            lesson_id: lesson_id.into(),
        }
    }

    /// Create an invalid catalog error.
    pub fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is a non-fatal warning rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::GraphCycle { .. })
    }
}

impl From<io::Error> for PathwayError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for PathwayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open handling of ambient errors.
///
/// Only used around configuration and other non-engine concerns. Engine
/// caller errors are never swallowed.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the Pathway CLI.
pub mod exit_codes {
    /// The command succeeded.
    pub const SUCCESS: i32 = 0;

    /// The command failed (caller error or storage failure).
    pub const ERROR: i32 = 1;
}

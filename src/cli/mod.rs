//! CLI commands for Pathway.
//!
//! This module provides CLI commands for Pathway, organized into:
//! - **Path commands**: path, next, complete (learning path)
//! - **Challenge commands**: list, start, select, submit, advance, status, abandon

// Path commands
pub mod complete;
pub mod path_cmd;

// Challenge commands
pub mod challenge;

mod learner;

pub use challenge::ChallengeCommand;
pub use complete::CompleteCommand;
pub use path_cmd::PathCommand;

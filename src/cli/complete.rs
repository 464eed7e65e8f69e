//! Complete command for Pathway.
//!
//! Marks a lesson completed, persists the learner record, and reports the
//! updated path including any modules the completion unlocked.

use serde::Serialize;

use crate::config::Config;
use crate::core::{Catalog, Intent};
use crate::error::Result;
use crate::storage::LearnerStore;

use super::learner::{load_record, open_engine, persist};
use super::path_cmd::{format_path_human, PathOutput};

/// Options for the complete command.
#[derive(Debug, Clone, Default)]
pub struct CompleteOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the complete command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOutput {
    pub success: bool,
    pub lesson_id: String,
    /// False when the lesson was already completed.
    pub newly_completed: bool,
    /// Modules that were locked before and are unlocked now.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unlocked_modules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompleteOutput {
    /// Create a failed output.
    pub fn failure(lesson_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            lesson_id: lesson_id.into(),
            newly_completed: false,
            unlocked_modules: Vec::new(),
            path: None,
            error: Some(error.into()),
        }
    }
}

/// The complete command implementation.
pub struct CompleteCommand<S: LearnerStore> {
    store: S,
    catalog: Catalog,
    config: Config,
}

impl<S: LearnerStore> CompleteCommand<S> {
    /// Create a new complete command.
    pub fn new(store: S, catalog: Catalog, config: Config) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Complete `lesson_id`.
    pub fn run(&self, lesson_id: &str, _options: &CompleteOptions) -> CompleteOutput {
        match self.run_inner(lesson_id) {
            Ok(output) => output,
            Err(e) => CompleteOutput::failure(lesson_id, e.to_string()),
        }
    }

    fn run_inner(&self, lesson_id: &str) -> Result<CompleteOutput> {
        let mut record = load_record(&self.store, &self.catalog)?;
        let mut engine = open_engine(&self.catalog, &self.config, &record);

        let was_completed = engine.state().completed_lessons.contains(lesson_id);
        let locked_before: Vec<String> = engine
            .view()
            .modules
            .iter()
            .filter(|m| m.is_locked)
            .map(|m| m.id.clone())
            .collect();

        let view = engine.dispatch(Intent::CompleteLesson {
            lesson_id: lesson_id.to_string(),
        })?;

        let unlocked_modules = locked_before
            .into_iter()
            .filter(|id| view.module(id).is_some_and(|m| !m.is_locked))
            .collect();

        persist(&self.store, &mut record, &engine)?;
        tracing::debug!(lesson = lesson_id, "lesson completion persisted");

        Ok(CompleteOutput {
            success: true,
            lesson_id: lesson_id.to_string(),
            newly_completed: !was_completed,
            unlocked_modules,
            path: Some(PathOutput::success(
                engine.view(),
                record.total_xp,
                record.streak.current,
            )),
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &CompleteOutput, options: &CompleteOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &CompleteOutput) -> String {
        if !output.success {
            return format!(
                "Could not complete {}: {}\n",
                output.lesson_id,
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = if output.newly_completed {
            format!("Completed {}.\n", output.lesson_id)
        } else {
            format!("{} was already completed.\n", output.lesson_id)
        };

        for module in &output.unlocked_modules {
            out.push_str(&format!("Unlocked module {}.\n", module));
        }
        out.push('\n');

        if let Some(path) = &output.path {
            out.push_str(&format_path_human(path));
        }
        out
    }
}

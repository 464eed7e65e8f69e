//! Path and next commands for Pathway.
//!
//! `path` shows every module with its lock state and progress, the overall
//! progress, and the current recommendation. `next` shows only the
//! recommendation.

use serde::Serialize;

use crate::config::Config;
use crate::core::{Catalog, ModuleStatus, ModuleView, PathView, Recommendation};
use crate::error::Result;
use crate::storage::LearnerStore;

use super::learner::{load_record, open_engine};

/// Options for the path and next commands.
#[derive(Debug, Clone, Default)]
pub struct PathOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the path command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOutput {
    /// Whether the path could be computed.
    pub success: bool,
    pub overall_progress: u32,
    /// XP from completed lessons and modules.
    pub lesson_xp: u32,
    /// XP paid out by daily challenges.
    pub challenge_xp: u32,
    pub streak: u32,
    pub modules: Vec<ModuleView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PathOutput {
    /// Create a successful output from a path view.
    pub fn success(view: &PathView, challenge_xp: u32, streak: u32) -> Self {
        Self {
            success: true,
            overall_progress: view.overall_progress,
            lesson_xp: view.total_xp,
            challenge_xp,
            streak,
            modules: view.modules.clone(),
            recommendation: view.recommendation.clone(),
            warnings: view.warnings.clone(),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            overall_progress: 0,
            lesson_xp: 0,
            challenge_xp: 0,
            streak: 0,
            modules: Vec::new(),
            recommendation: None,
            warnings: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Output format for the next command.
#[derive(Debug, Clone, Serialize)]
pub struct NextOutput {
    pub success: bool,
    /// `None` when nothing is available to recommend.
    pub recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The path command implementation.
pub struct PathCommand<S: LearnerStore> {
    store: S,
    catalog: Catalog,
    config: Config,
}

impl<S: LearnerStore> PathCommand<S> {
    /// Create a new path command.
    pub fn new(store: S, catalog: Catalog, config: Config) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Run the path command.
    pub fn run(&self, _options: &PathOptions) -> PathOutput {
        match self.run_inner() {
            Ok(output) => output,
            Err(e) => PathOutput::failure(e.to_string()),
        }
    }

    fn run_inner(&self) -> Result<PathOutput> {
        let record = load_record(&self.store, &self.catalog)?;
        let engine = open_engine(&self.catalog, &self.config, &record);
        Ok(PathOutput::success(
            engine.view(),
            record.total_xp,
            record.streak.current,
        ))
    }

    /// Run the next command.
    pub fn next(&self, _options: &PathOptions) -> NextOutput {
        match load_record(&self.store, &self.catalog) {
            Ok(record) => {
                let engine = open_engine(&self.catalog, &self.config, &record);
                NextOutput {
                    success: true,
                    recommendation: engine.view().recommendation.clone(),
                    error: None,
                }
            }
            Err(e) => NextOutput {
                success: false,
                recommendation: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Format path output based on options.
    pub fn format_output(&self, output: &PathOutput, options: &PathOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            format_path_human(output)
        }
    }

    /// Format next output based on options.
    pub fn format_next(&self, output: &NextOutput, options: &PathOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        match (&output.recommendation, &output.error) {
            (_, Some(error)) => format!("Failed to load path: {}\n", error),
            (Some(rec), None) => format!(
                "Next: {} ({})\n  in {} ({})\n",
                rec.lesson_title, rec.lesson_id, rec.module_title, rec.module_id
            ),
            (None, None) => "Nothing to recommend right now.\n".to_string(),
        }
    }
}

fn status_marker(status: ModuleStatus) -> &'static str {
    match status {
        ModuleStatus::Locked => "[locked]",
        ModuleStatus::NotStarted => "[ ]",
        ModuleStatus::InProgress => "[~]",
        ModuleStatus::Completed => "[x]",
    }
}

/// Human-readable rendering shared with the complete command.
pub(crate) fn format_path_human(output: &PathOutput) -> String {
    if !output.success {
        return format!(
            "Failed to load path: {}\n",
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut out = format!(
        "Overall progress: {}%  |  XP: {} lessons + {} challenges  |  Streak: {}\n\n",
        output.overall_progress, output.lesson_xp, output.challenge_xp, output.streak
    );

    for module in &output.modules {
        let star = if module.is_recommended { " *" } else { "" };
        out.push_str(&format!(
            "{} {} ({}) {}%{}\n",
            status_marker(module.status),
            module.title,
            module.id,
            module.progress,
            star
        ));
        for lesson in &module.lessons {
            let mark = match (lesson.is_completed, lesson.is_locked) {
                (true, _) => "x",
                (false, true) => "-",
                (false, false) => " ",
            };
            out.push_str(&format!("    [{}] {} ({})\n", mark, lesson.title, lesson.id));
        }
    }

    if let Some(rec) = &output.recommendation {
        out.push_str(&format!(
            "\nNext: {} ({}) in {}\n",
            rec.lesson_title, rec.lesson_id, rec.module_title
        ));
    }

    for warning in &output.warnings {
        out.push_str(&format!("\nWarning: {}\n", warning));
    }

    out
}

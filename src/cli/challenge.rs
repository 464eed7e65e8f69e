//! Challenge command for Pathway.
//!
//! Drives a daily challenge session one intent per invocation:
//! `list`, `start <id>`, `select <index>`, `submit`, `advance`, `status`,
//! and `abandon`. The in-flight session lives in the learner record.
//!
//! When a session finishes, the streak is updated first and the reward is
//! computed against the updated streak. The payout then goes to the ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::core::{Catalog, Engine, Intent, RewardOutcome, SessionPhase, SessionView};
use crate::error::{PathwayError, Result};
use crate::storage::{LearnerRecord, LearnerStore};

use super::learner::{load_record, open_engine, persist};

/// Options for the challenge command.
#[derive(Debug, Clone, Default)]
pub struct ChallengeOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One challenge in the `list` output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSummary {
    pub id: String,
    pub title: String,
    pub questions: usize,
    pub total_points: u32,
    pub xp_reward: u32,
    pub streak_bonus: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<u32>,
}

/// Output format for the challenge command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeOutput {
    pub success: bool,
    /// Which subcommand produced this output.
    pub action: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub challenges: Vec<ChallengeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionView>,
    /// Correctness of the answer just submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
    /// Reward paid out by this invocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout: Option<RewardOutcome>,
    pub streak: u32,
    pub challenge_xp: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChallengeOutput {
    fn success(action: &str, record: &LearnerRecord) -> Self {
        Self {
            success: true,
            action: action.to_string(),
            challenges: Vec::new(),
            session: None,
            correct: None,
            payout: None,
            streak: record.streak.current,
            challenge_xp: record.total_xp,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(action: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            challenges: Vec::new(),
            session: None,
            correct: None,
            payout: None,
            streak: 0,
            challenge_xp: 0,
            error: Some(error.into()),
        }
    }
}

/// The challenge command implementation.
pub struct ChallengeCommand<S: LearnerStore> {
    store: S,
    catalog: Catalog,
    config: Config,
    /// Fixed clock for tests; `None` reads the system clock.
    clock: Option<DateTime<Utc>>,
}

impl<S: LearnerStore> ChallengeCommand<S> {
    /// Create a new challenge command.
    pub fn new(store: S, catalog: Catalog, config: Config) -> Self {
        Self {
            store,
            catalog,
            config,
            clock: None,
        }
    }

    /// Pin the clock used for streak days and session timing.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    /// List the catalog's challenges.
    pub fn list(&self, _options: &ChallengeOptions) -> ChallengeOutput {
        let record = match load_record(&self.store, &self.catalog) {
            Ok(record) => record,
            Err(e) => return ChallengeOutput::failure("list", e.to_string()),
        };

        let mut output = ChallengeOutput::success("list", &record);
        output.challenges = self
            .catalog
            .challenges()
            .iter()
            .map(|c| ChallengeSummary {
                id: c.id.clone(),
                title: c.title.clone(),
                questions: c.questions.len(),
                total_points: c.total_points(),
                xp_reward: c.xp_reward,
                streak_bonus: c.streak_bonus,
                time_limit_seconds: c.time_limit_seconds,
            })
            .collect();
        output
    }

    /// Start a session, replacing any active one.
    pub fn start(&self, challenge_id: &str, _options: &ChallengeOptions) -> ChallengeOutput {
        self.apply(
            "start",
            Intent::StartSession {
                challenge_id: challenge_id.to_string(),
            },
        )
    }

    /// Select an option for the current question.
    pub fn select(&self, option_index: usize, _options: &ChallengeOptions) -> ChallengeOutput {
        self.apply("select", Intent::SelectAnswer { option_index })
    }

    /// Submit the selected answer.
    pub fn submit(&self, _options: &ChallengeOptions) -> ChallengeOutput {
        let mut output = self.apply("submit", Intent::SubmitAnswer);
        if output.success {
            output.correct = output
                .session
                .as_ref()
                .and_then(|s| s.results.last())
                .map(|r| r.correct);
        }
        output
    }

    /// Move past the explanation, finishing the session after the last question.
    pub fn advance(&self, _options: &ChallengeOptions) -> ChallengeOutput {
        self.apply("advance", Intent::Advance)
    }

    /// Show the active session without changing it.
    pub fn status(&self, _options: &ChallengeOptions) -> ChallengeOutput {
        let result = load_record(&self.store, &self.catalog).and_then(|record| {
            let engine = open_engine(&self.catalog, &self.config, &record);
            let session = engine
                .session_view(self.now())
                .ok_or(PathwayError::NoActiveSession)?;
            let mut output = ChallengeOutput::success("status", &record);
            output.session = Some(session);
            Ok(output)
        });

        result.unwrap_or_else(|e| ChallengeOutput::failure("status", e.to_string()))
    }

    /// Drop the active session without a payout.
    pub fn abandon(&self, _options: &ChallengeOptions) -> ChallengeOutput {
        let result = load_record(&self.store, &self.catalog).and_then(|mut record| {
            let mut engine = open_engine(&self.catalog, &self.config, &record);
            let dropped = engine
                .abandon_session()
                .ok_or(PathwayError::NoActiveSession)?;
            persist(&self.store, &mut record, &engine)?;
            tracing::debug!(challenge = %dropped.challenge_id, "session abandoned");
            Ok(ChallengeOutput::success("abandon", &record))
        });

        result.unwrap_or_else(|e| ChallengeOutput::failure("abandon", e.to_string()))
    }

    fn apply(&self, action: &str, intent: Intent) -> ChallengeOutput {
        match self.apply_inner(action, intent) {
            Ok(output) => output,
            Err(e) => ChallengeOutput::failure(action, e.to_string()),
        }
    }

    fn apply_inner(&self, action: &str, intent: Intent) -> Result<ChallengeOutput> {
        let now = self.now();
        let mut record = load_record(&self.store, &self.catalog)?;
        let mut engine = open_engine(&self.catalog, &self.config, &record);

        let was_finished = is_finished(&engine);

        // Only a finishing session reads the streak; use the streak as it
        // will be once this challenge counts.
        let projected = record.streak.projected(now.date_naive());
        engine.set_streak(projected.current);

        engine.dispatch(intent)?;

        let mut payout = None;
        if !was_finished && is_finished(&engine) {
            if let Some(session) = &engine.state().session {
                if let Some(reward) = session.reward {
                    record.streak = projected;
                    record.record_payout(
                        session.challenge_id.clone(),
                        reward,
                        session.finished_at.unwrap_or(now),
                    );
                    payout = Some(reward);
                    tracing::info!(
                        challenge = %session.challenge_id,
                        xp = reward.xp_awarded,
                        streak = record.streak.current,
                        "challenge reward recorded"
                    );
                }
            }
        }

        persist(&self.store, &mut record, &engine)?;

        let mut output = ChallengeOutput::success(action, &record);
        output.session = engine.session_view(now);
        output.payout = payout;
        Ok(output)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ChallengeOutput, options: &ChallengeOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ChallengeOutput) -> String {
        if !output.success {
            return format!(
                "Challenge {} failed: {}\n",
                output.action,
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = String::new();

        if output.action == "list" {
            if output.challenges.is_empty() {
                return "No challenges available.\n".to_string();
            }
            for c in &output.challenges {
                out.push_str(&format!(
                    "{} - {} ({} questions, {} XP",
                    c.id, c.title, c.questions, c.xp_reward
                ));
                if c.streak_bonus > 0 {
                    out.push_str(&format!(", +{} streak bonus", c.streak_bonus));
                }
                if let Some(limit) = c.time_limit_seconds {
                    out.push_str(&format!(", {}s", limit));
                }
                out.push_str(")\n");
            }
            return out;
        }

        if output.action == "abandon" {
            return "Session abandoned.\n".to_string();
        }

        if let Some(correct) = output.correct {
            out.push_str(if correct { "Correct!\n" } else { "Incorrect.\n" });
        }

        if let Some(session) = &output.session {
            out.push_str(&format_session(session));
        }

        if let Some(payout) = &output.payout {
            out.push_str(&format!(
                "\nEarned {} XP{}. Streak: {} days. Challenge XP: {}.\n",
                payout.xp_awarded,
                if payout.streak_bonus_applied {
                    " (streak bonus)"
                } else {
                    ""
                },
                output.streak,
                output.challenge_xp
            ));
        }

        out
    }
}

fn is_finished(engine: &Engine) -> bool {
    engine
        .state()
        .session
        .as_ref()
        .is_some_and(|s| s.phase == SessionPhase::Finished)
}

fn format_session(session: &SessionView) -> String {
    let mut out = format!(
        "{} ({}): {} / {} points\n",
        session.challenge_title,
        session.phase.name(),
        session.accumulated_score,
        session.total_possible_points
    );

    if let Some(remaining) = session.remaining_seconds {
        out.push_str(&format!("Time left: {}s\n", remaining));
    }

    if let Some(question) = &session.current_question {
        out.push_str(&format!(
            "\nQuestion {}/{}: {}\n",
            session.question_cursor + 1,
            session.total_questions,
            question.prompt
        ));
        for (i, option) in question.options.iter().enumerate() {
            let selected = if question.selected_option == Some(i) {
                ">"
            } else {
                " "
            };
            let correct = if question.correct_option_index == Some(i) {
                " (correct)"
            } else {
                ""
            };
            out.push_str(&format!("  {} {}. {}{}\n", selected, i, option, correct));
        }
        if let Some(explanation) = question.explanation.as_deref().filter(|e| !e.is_empty()) {
            out.push_str(&format!("\n{}\n", explanation));
        }
    }

    if let Some(reward) = &session.reward {
        out.push_str(&format!("Score: {}%\n", reward.raw_score));
    }

    out
}

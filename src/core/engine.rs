//! Intent-driven engine for Pathway.
//!
//! The engine owns one mutable store ([`EngineState`]: completed lessons, the
//! active session, and the learner's streak). Every user intent goes through
//! [`Engine::reduce`], which returns a new state or an error and never a
//! partially applied one. After each successful dispatch the whole path view
//! is recomputed.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::catalog::Catalog;
use crate::core::progression::{complete_lesson, PathView, Progression};
use crate::core::recommend::{FlaggedRecommender, Recommender};
use crate::core::reward::RewardPolicy;
use crate::core::session::{start_session, Assessment, ChallengeSession, SessionView};
use crate::error::{PathwayError, Result};

/// A discrete user intent forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    CompleteLesson { lesson_id: String },
    StartSession { challenge_id: String },
    SelectAnswer { option_index: usize },
    SubmitAnswer,
    Advance,
}

impl Intent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::CompleteLesson { .. } => "complete_lesson",
            Intent::StartSession { .. } => "start_session",
            Intent::SelectAnswer { .. } => "select_answer",
            Intent::SubmitAnswer => "submit_answer",
            Intent::Advance => "advance",
        }
    }
}

/// The engine's mutable store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub completed_lessons: BTreeSet<String>,
    pub session: Option<ChallengeSession>,
    /// Consecutive challenge days, supplied by the caller.
    pub current_streak: u32,
}

/// Behavior switches read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Refuse completion of locked lessons. On unless configured off.
    pub enforce_lesson_order: bool,
    pub reward_policy: RewardPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enforce_lesson_order: true,
            reward_policy: RewardPolicy::default(),
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            enforce_lesson_order: config.progression.enforce_lesson_order,
            reward_policy: RewardPolicy::with_threshold(config.reward.streak_threshold),
        }
    }
}

/// Progression and assessment engine over one catalog.
pub struct Engine {
    catalog: Catalog,
    recommender: Box<dyn Recommender>,
    settings: EngineSettings,
    state: EngineState,
    view: PathView,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine seeded with the catalog's snapshot completion flags.
    pub fn new(catalog: Catalog) -> Self {
        let state = EngineState {
            completed_lessons: catalog.initial_completions(),
            ..Default::default()
        };
        Self::with_state(catalog, state)
    }

    /// Create an engine from a previously persisted state.
    ///
    /// A persisted session that no longer fits the catalog (its challenge was
    /// removed or lost the question under the cursor) is dropped.
    pub fn with_state(catalog: Catalog, mut state: EngineState) -> Self {
        if let Some(session) = &state.session {
            if !session_fits(&catalog, session) {
                tracing::warn!(
                    challenge = %session.challenge_id,
                    cursor = session.question_cursor,
                    "dropping session that no longer matches the catalog"
                );
                state.session = None;
            }
        }

        let mut engine = Self {
            catalog,
            recommender: Box::new(FlaggedRecommender),
            settings: EngineSettings::default(),
            state,
            view: PathView::default(),
        };
        engine.recompute();
        engine
    }

    /// Replace the recommendation strategy.
    pub fn with_recommender(mut self, recommender: impl Recommender + 'static) -> Self {
        self.recommender = Box::new(recommender);
        self.recompute();
        self
    }

    /// Replace the behavior settings.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Path view as of the last successful dispatch.
    pub fn view(&self) -> &PathView {
        &self.view
    }

    /// A fresh progression snapshot over the current state.
    pub fn progression(&self) -> Progression<'_> {
        Progression::new(&self.catalog, &self.state.completed_lessons)
    }

    /// View of the active session, if any.
    pub fn session_view(&self, now: DateTime<Utc>) -> Option<SessionView> {
        let session = self.state.session.as_ref()?;
        let challenge = self.catalog.challenge(&session.challenge_id)?;
        Some(SessionView::new(session, challenge, now))
    }

    /// Update the streak used for rewards of sessions finishing from now on.
    pub fn set_streak(&mut self, streak: u32) {
        self.state.current_streak = streak;
    }

    /// Drop the active session.
    pub fn abandon_session(&mut self) -> Option<ChallengeSession> {
        self.state.session.take()
    }

    /// Compute the state that results from applying `intent` to `state`.
    ///
    /// Pure with respect to `state`: on error nothing is returned, so callers
    /// never observe a partially applied intent.
    pub fn reduce(&self, state: &EngineState, intent: Intent) -> Result<EngineState> {
        let mut next = state.clone();

        match intent {
            Intent::CompleteLesson { lesson_id } => {
                complete_lesson(
                    &self.catalog,
                    &mut next.completed_lessons,
                    &lesson_id,
                    self.settings.enforce_lesson_order,
                )?;
            }
            Intent::StartSession { challenge_id } => {
                let challenge = self
                    .catalog
                    .challenge(&challenge_id)
                    .ok_or_else(|| PathwayError::unknown_challenge(&challenge_id))?;
                next.session = Some(start_session(challenge)?);
            }
            Intent::SelectAnswer { option_index } => {
                self.assessment(&mut next)?.select_answer(option_index)?;
            }
            Intent::SubmitAnswer => {
                self.assessment(&mut next)?.submit_answer()?;
            }
            Intent::Advance => {
                self.assessment(&mut next)?.advance()?;
            }
        }

        Ok(next)
    }

    /// Apply an intent to the owned state and recompute the path view.
    pub fn dispatch(&mut self, intent: Intent) -> Result<&PathView> {
        let name = intent.name();
        match self.reduce(&self.state, intent) {
            Ok(next) => {
                self.state = next;
                self.recompute();
                tracing::debug!(intent = name, "intent applied");
                Ok(&self.view)
            }
            Err(e) => {
                tracing::debug!(intent = name, error = %e, "intent rejected");
                Err(e)
            }
        }
    }

    fn assessment<'s>(&'s self, state: &'s mut EngineState) -> Result<Assessment<'s>> {
        let streak = state.current_streak;
        let session = state.session.as_mut().ok_or(PathwayError::NoActiveSession)?;
        let challenge = self
            .catalog
            .challenge(&session.challenge_id)
            .ok_or_else(|| PathwayError::unknown_challenge(&session.challenge_id))?;
        Ok(Assessment::new(
            session,
            challenge,
            self.settings.reward_policy,
            streak,
        ))
    }

    /// Full recompute of the path view over the current state.
    fn recompute(&mut self) {
        let progression = Progression::new(&self.catalog, &self.state.completed_lessons);
        if let Some(warning) = progression.lock_state().cycle_warning() {
            tracing::warn!("{}", warning);
        }
        self.view = progression.view(self.recommender.as_ref());
    }
}

fn session_fits(catalog: &Catalog, session: &ChallengeSession) -> bool {
    catalog
        .challenge(&session.challenge_id)
        .is_some_and(|c| session.question_cursor < c.questions.len())
}

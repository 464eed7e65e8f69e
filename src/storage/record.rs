//! The persisted learner record.
//!
//! The engine itself is storage-free. The CLI keeps one record per learner
//! holding everything that must survive between invocations: completed
//! lessons, the challenge streak, the in-flight session, and the reward
//! ledger.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Catalog, ChallengeSession, EngineState, RewardOutcome};

/// Current record schema version.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Consecutive-day challenge streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    /// Length of the current streak in days.
    pub current: u32,
    /// Day of the most recent finished challenge.
    pub last_challenge_on: Option<NaiveDate>,
}

impl StreakState {
    /// Count a finished challenge on `today`.
    ///
    /// Same day leaves the streak unchanged, the following day extends it,
    /// anything else (including the first challenge ever) restarts it at 1.
    pub fn record_challenge(&mut self, today: NaiveDate) {
        self.current = match self.last_challenge_on {
            Some(last) if last == today => self.current.max(1),
            Some(last) if last.succ_opt() == Some(today) => self.current.saturating_add(1),
            _ => 1,
        };
        self.last_challenge_on = Some(today);
    }

    /// The streak that would result from finishing a challenge on `today`.
    pub fn projected(&self, today: NaiveDate) -> StreakState {
        let mut next = *self;
        next.record_challenge(today);
        next
    }
}

/// One challenge payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardLedgerEntry {
    pub challenge_id: String,
    pub finished_at: DateTime<Utc>,
    /// Streak length the reward was computed with.
    pub streak: u32,
    #[serde(flatten)]
    pub outcome: RewardOutcome,
}

/// Everything persisted for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub completed_lessons: BTreeSet<String>,
    #[serde(default)]
    pub streak: StreakState,
    #[serde(default)]
    pub active_session: Option<ChallengeSession>,
    #[serde(default)]
    pub ledger: Vec<RewardLedgerEntry>,
    /// Sum of challenge XP paid out through the ledger.
    #[serde(default)]
    pub total_xp: u32,
    pub updated_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    RECORD_SCHEMA_VERSION
}

impl LearnerRecord {
    /// A fresh record seeded with the catalog's snapshot completions.
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            completed_lessons: catalog.initial_completions(),
            streak: StreakState::default(),
            active_session: None,
            ledger: Vec::new(),
            total_xp: 0,
            updated_at: Utc::now(),
        }
    }

    /// Engine state for this record. The streak is the persisted one;
    /// callers about to finish a session substitute the projected streak.
    pub fn engine_state(&self) -> EngineState {
        EngineState {
            completed_lessons: self.completed_lessons.clone(),
            session: self.active_session.clone(),
            current_streak: self.streak.current,
        }
    }

    /// Copy engine-owned fields back into the record.
    pub fn absorb(&mut self, state: &EngineState) {
        self.completed_lessons = state.completed_lessons.clone();
        self.active_session = state.session.clone();
        self.touch();
    }

    /// Append a payout to the ledger.
    pub fn record_payout(
        &mut self,
        challenge_id: impl Into<String>,
        outcome: RewardOutcome,
        finished_at: DateTime<Utc>,
    ) {
        self.ledger.push(RewardLedgerEntry {
            challenge_id: challenge_id.into(),
            finished_at,
            streak: self.streak.current,
            outcome,
        });
        self.total_xp = self.total_xp.saturating_add(outcome.xp_awarded);
        self.touch();
    }

    /// Update the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

//! Reward policy for Pathway.
//!
//! Converts a raw challenge score into an XP payout, adding a flat bonus
//! once the learner's streak reaches the threshold:
//!
//! 1. `raw_score = round(100 * score / total)` (0 when `total == 0`)
//! 2. `xp = round(raw_score / 100 * base_xp)`
//! 3. `xp += streak_bonus` when `streak >= threshold`
//!
//! All rounding is half-up on exact integer ratios.

use serde::{Deserialize, Serialize};

/// Streak length at which the bonus is paid.
pub const DEFAULT_STREAK_THRESHOLD: u32 = 7;

/// Result of scoring a finished challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardOutcome {
    /// Percentage of possible points earned (0-100).
    pub raw_score: u32,
    pub xp_awarded: u32,
    pub streak_bonus_applied: bool,
}

/// Reward policy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPolicy {
    pub streak_threshold: u32,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            streak_threshold: DEFAULT_STREAK_THRESHOLD,
        }
    }
}

impl RewardPolicy {
    /// Create a policy with a custom streak threshold.
    pub fn with_threshold(streak_threshold: u32) -> Self {
        Self { streak_threshold }
    }

    /// Compute the payout for a finished challenge.
    pub fn compute(
        &self,
        accumulated_score: u32,
        total_possible_points: u32,
        base_xp_reward: u32,
        current_streak: u32,
        streak_bonus: u32,
    ) -> RewardOutcome {
        let raw_score = percentage(accumulated_score, total_possible_points);
        let mut xp_awarded =
            round_ratio(u64::from(raw_score) * u64::from(base_xp_reward), 100) as u32;

        let streak_bonus_applied = current_streak >= self.streak_threshold;
        if streak_bonus_applied {
            xp_awarded = xp_awarded.saturating_add(streak_bonus);
        }

        RewardOutcome {
            raw_score,
            xp_awarded,
            streak_bonus_applied,
        }
    }
}

/// Compute a reward with the default streak threshold.
pub fn compute_reward(
    accumulated_score: u32,
    total_possible_points: u32,
    base_xp_reward: u32,
    current_streak: u32,
    streak_bonus: u32,
) -> RewardOutcome {
    RewardPolicy::default().compute(
        accumulated_score,
        total_possible_points,
        base_xp_reward,
        current_streak,
        streak_bonus,
    )
}

/// `round(100 * part / whole)`, or 0 when `whole == 0`.
pub fn percentage(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    round_ratio(100 * u64::from(part), u64::from(whole)) as u32
}

/// Half-up rounding of `numerator / denominator`. `denominator` must be > 0.
pub(crate) fn round_ratio(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

//! Recommendation strategies.
//!
//! A strategy only chooses the module. [`Progression::select_recommendation`]
//! then picks the first available lesson inside it, so swapping the
//! strategy never changes the lesson-level rule.
//!
//! [`Progression::select_recommendation`]: crate::core::Progression::select_recommendation

use crate::core::progression::Progression;

/// Strategy that picks the module to recommend.
///
/// Any `Fn(&Progression) -> Option<String>` closure is also a strategy.
pub trait Recommender: Send + Sync {
    /// Return the id of the module to recommend, if any.
    fn recommend_module(&self, progression: &Progression<'_>) -> Option<String>;
}

impl<F> Recommender for F
where
    F: Fn(&Progression<'_>) -> Option<String> + Send + Sync,
{
    fn recommend_module(&self, progression: &Progression<'_>) -> Option<String> {
        self(progression)
    }
}

/// Default strategy: first module in catalog order carrying the
/// `recommended` authoring flag that is not locked.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlaggedRecommender;

impl Recommender for FlaggedRecommender {
    fn recommend_module(&self, progression: &Progression<'_>) -> Option<String> {
        progression
            .catalog()
            .modules()
            .iter()
            .find(|m| m.recommended && !progression.is_module_locked(&m.id))
            .map(|m| m.id.clone())
    }
}

/// Picks the first unlocked module that is not yet completed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstUnlockedRecommender;

impl Recommender for FirstUnlockedRecommender {
    fn recommend_module(&self, progression: &Progression<'_>) -> Option<String> {
        progression
            .catalog()
            .modules()
            .iter()
            .find(|m| !progression.is_module_locked(&m.id) && !progression.is_module_completed(m))
            .map(|m| m.id.clone())
    }
}

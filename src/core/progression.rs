//! Progression over the module graph.
//!
//! Everything here is derived from two inputs: the catalog snapshot and the
//! set of completed lesson ids. A [`Progression`] computes lock state for the
//! whole graph when it is built, so every query made through one instance
//! sees the same consistent snapshot.
//!
//! Per-module state machine (derived, never stored):
//!
//! ```text
//! Locked -> NotStarted -> InProgress -> Completed
//! ```
//!
//! Unlocking is a pure function of prerequisite completion; there is no
//! explicit unlock action.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::catalog::{Catalog, Lesson, Module};
use crate::core::recommend::Recommender;
use crate::core::reward::{percentage, round_ratio};
use crate::error::{PathwayError, Result};

/// Derived lock state for every module in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockState {
    /// Module id to locked flag, for every module.
    pub locked: BTreeMap<String, bool>,
    /// Modules that sit on a prerequisite cycle. Always locked.
    pub cycle_members: BTreeSet<String>,
}

impl LockState {
    /// The cycle warning for the caller, if any cycle was detected.
    pub fn cycle_warning(&self) -> Option<PathwayError> {
        if self.cycle_members.is_empty() {
            None
        } else {
            Some(PathwayError::GraphCycle {
                modules: self.cycle_members.iter().cloned().collect(),
            })
        }
    }
}

/// Derived status of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Locked,
    NotStarted,
    InProgress,
    Completed,
}

/// The lesson to do next and the module it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub module_id: String,
    pub module_title: String,
    pub lesson_id: String,
    pub lesson_title: String,
}

/// Derived lesson fields for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
    pub is_locked: bool,
}

/// Derived module fields for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub id: String,
    pub title: String,
    pub is_locked: bool,
    pub progress: u32,
    pub is_completed: bool,
    pub is_recommended: bool,
    pub status: ModuleStatus,
    pub lessons: Vec<LessonView>,
}

/// Whole-path view model handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathView {
    pub modules: Vec<ModuleView>,
    pub overall_progress: u32,
    pub recommendation: Option<Recommendation>,
    pub total_xp: u32,
    /// Non-fatal warnings (prerequisite cycles).
    pub warnings: Vec<String>,
}

impl PathView {
    /// Look up a module view by id.
    pub fn module(&self, id: &str) -> Option<&ModuleView> {
        self.modules.iter().find(|m| m.id == id)
    }
}

/// Compute lock state for every module.
///
/// A module is locked iff at least one prerequisite is not completed.
/// Modules on a prerequisite cycle are locked regardless.
pub fn compute_lock_state(catalog: &Catalog, completed: &BTreeSet<String>) -> LockState {
    let cycle_members = detect_cycle_members(catalog);

    let locked = catalog
        .modules()
        .iter()
        .map(|module| {
            let is_locked = cycle_members.contains(&module.id)
                || module.prerequisites.iter().any(|prereq| {
                    catalog
                        .module(prereq)
                        .map(|p| !module_completed(p, completed))
                        .unwrap_or(true)
                });
            (module.id.clone(), is_locked)
        })
        .collect();

    LockState {
        locked,
        cycle_members,
    }
}

/// Percentage of a module's lessons that are completed. 0 for empty modules.
pub fn compute_module_progress(module: &Module, completed: &BTreeSet<String>) -> u32 {
    let done = module
        .lessons
        .iter()
        .filter(|l| completed.contains(&l.id))
        .count() as u32;
    percentage(done, module.lessons.len() as u32)
}

/// Average module contribution across the catalog. 0 when there are no modules.
///
/// Completed modules contribute 100, others their own progress.
pub fn compute_overall_progress(catalog: &Catalog, completed: &BTreeSet<String>) -> u32 {
    let modules = catalog.modules();
    if modules.is_empty() {
        return 0;
    }

    let sum: u64 = modules
        .iter()
        .map(|m| {
            if module_completed(m, completed) {
                100
            } else {
                u64::from(compute_module_progress(m, completed))
            }
        })
        .sum();

    round_ratio(sum, modules.len() as u64) as u32
}

/// A module is completed when every one of its lessons is.
fn module_completed(module: &Module, completed: &BTreeSet<String>) -> bool {
    module.lessons.iter().all(|l| completed.contains(&l.id))
}

/// Ids of modules that can reach themselves through prerequisite edges.
fn detect_cycle_members(catalog: &Catalog) -> BTreeSet<String> {
    catalog
        .modules()
        .iter()
        .filter(|m| reaches(catalog, &m.id, &m.id))
        .map(|m| m.id.clone())
        .collect()
}

/// Breadth-first search over prerequisites from `from`, looking for `target`.
fn reaches(catalog: &Catalog, from: &str, target: &str) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    if let Some(start) = catalog.module(from) {
        queue.extend(start.prerequisites.iter().map(String::as_str));
    }

    while let Some(id) = queue.pop_front() {
        if id == target {
            return true;
        }
        if !visited.insert(id) {
            continue;
        }
        if let Some(module) = catalog.module(id) {
            queue.extend(module.prerequisites.iter().map(String::as_str));
        }
    }

    false
}

/// Consistent progression snapshot over a catalog and completion set.
#[derive(Debug, Clone)]
pub struct Progression<'a> {
    catalog: &'a Catalog,
    completed: &'a BTreeSet<String>,
    locks: LockState,
}

impl<'a> Progression<'a> {
    /// Build a snapshot, computing lock state for the whole graph.
    pub fn new(catalog: &'a Catalog, completed: &'a BTreeSet<String>) -> Self {
        let locks = compute_lock_state(catalog, completed);
        Self {
            catalog,
            completed,
            locks,
        }
    }

    /// The catalog this snapshot reads.
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Lock state computed for this snapshot.
    pub fn lock_state(&self) -> &LockState {
        &self.locks
    }

    /// Whether a module is locked. Unknown ids read as locked.
    pub fn is_module_locked(&self, module_id: &str) -> bool {
        self.locks.locked.get(module_id).copied().unwrap_or(true)
    }

    pub fn is_module_completed(&self, module: &Module) -> bool {
        module_completed(module, self.completed)
    }

    pub fn is_lesson_completed(&self, lesson_id: &str) -> bool {
        self.completed.contains(lesson_id)
    }

    pub fn module_progress(&self, module: &Module) -> u32 {
        compute_module_progress(module, self.completed)
    }

    pub fn overall_progress(&self) -> u32 {
        compute_overall_progress(self.catalog, self.completed)
    }

    pub fn module_status(&self, module: &Module) -> ModuleStatus {
        if self.is_module_locked(&module.id) {
            ModuleStatus::Locked
        } else if self.is_module_completed(module) {
            ModuleStatus::Completed
        } else if module.lessons.iter().any(|l| self.is_lesson_completed(&l.id)) {
            ModuleStatus::InProgress
        } else {
            ModuleStatus::NotStarted
        }
    }

    /// Lock flag for each lesson of `module`, in lesson order.
    ///
    /// Every lesson of a locked module is locked. Inside an unlocked module a
    /// lesson is locked iff some earlier lesson is not completed.
    pub fn lesson_lock_state(&self, module: &Module) -> Vec<bool> {
        if self.is_module_locked(&module.id) {
            return vec![true; module.lessons.len()];
        }

        let mut all_prior_done = true;
        module
            .lessons
            .iter()
            .map(|lesson| {
                let locked = !all_prior_done;
                all_prior_done &= self.is_lesson_completed(&lesson.id);
                locked
            })
            .collect()
    }

    /// Whether a lesson is locked. Unknown ids read as locked.
    pub fn is_lesson_locked(&self, lesson_id: &str) -> bool {
        match self.catalog.find_lesson(lesson_id) {
            Some((module, idx)) => self.lesson_lock_state(module)[idx],
            None => true,
        }
    }

    /// Pick the next lesson to work on.
    ///
    /// The strategy chooses the module; the lesson is the first one in it that
    /// is neither completed nor locked. Returns `None` when the strategy has no
    /// pick or the picked module has nothing available.
    pub fn select_recommendation(
        &self,
        recommender: &dyn Recommender,
    ) -> Option<(&'a Module, &'a Lesson)> {
        let module_id = recommender.recommend_module(self)?;
        let module = self.catalog.module(&module_id)?;
        if self.is_module_locked(&module.id) {
            tracing::debug!(module = %module.id, "recommended module is locked, ignoring");
            return None;
        }

        let locks = self.lesson_lock_state(module);
        module
            .lessons
            .iter()
            .zip(locks)
            .find(|(lesson, locked)| !locked && !self.is_lesson_completed(&lesson.id))
            .map(|(lesson, _)| (module, lesson))
    }

    /// XP earned so far: completed lessons plus fully completed modules.
    pub fn total_xp_earned(&self) -> u32 {
        self.catalog
            .modules()
            .iter()
            .map(|m| {
                let lesson_xp: u32 = m
                    .lessons
                    .iter()
                    .filter(|l| self.is_lesson_completed(&l.id))
                    .map(|l| l.xp_reward)
                    .sum();
                let module_xp = if self.is_module_completed(m) {
                    m.xp_reward
                } else {
                    0
                };
                lesson_xp + module_xp
            })
            .sum()
    }

    /// Build the full view model.
    pub fn view(&self, recommender: &dyn Recommender) -> PathView {
        let recommendation = self
            .select_recommendation(recommender)
            .map(|(module, lesson)| Recommendation {
                module_id: module.id.clone(),
                module_title: module.title.clone(),
                lesson_id: lesson.id.clone(),
                lesson_title: lesson.title.clone(),
            });

        let modules = self
            .catalog
            .modules()
            .iter()
            .map(|module| {
                let lesson_locks = self.lesson_lock_state(module);
                ModuleView {
                    id: module.id.clone(),
                    title: module.title.clone(),
                    is_locked: self.is_module_locked(&module.id),
                    progress: self.module_progress(module),
                    is_completed: self.is_module_completed(module),
                    is_recommended: recommendation
                        .as_ref()
                        .is_some_and(|r| r.module_id == module.id),
                    status: self.module_status(module),
                    lessons: module
                        .lessons
                        .iter()
                        .zip(lesson_locks)
                        .map(|(lesson, is_locked)| LessonView {
                            id: lesson.id.clone(),
                            title: lesson.title.clone(),
                            is_completed: self.is_lesson_completed(&lesson.id),
                            is_locked,
                        })
                        .collect(),
                }
            })
            .collect();

        let warnings = self
            .locks
            .cycle_warning()
            .map(|w| vec![w.to_string()])
            .unwrap_or_default();

        PathView {
            modules,
            overall_progress: self.overall_progress(),
            recommendation,
            total_xp: self.total_xp_earned(),
            warnings,
        }
    }
}

/// Mark a lesson completed.
///
/// Returns `Ok(true)` when the set changed and `Ok(false)` when the lesson was
/// already completed. Fails with `UnknownLesson` for ids not in the catalog,
/// and with `LessonLocked` for locked lessons when `enforce_order` is set.
/// The set is untouched on failure.
pub fn complete_lesson(
    catalog: &Catalog,
    completed: &mut BTreeSet<String>,
    lesson_id: &str,
    enforce_order: bool,
) -> Result<bool> {
    if catalog.find_lesson(lesson_id).is_none() {
        return Err(PathwayError::unknown_lesson(lesson_id));
    }
    if completed.contains(lesson_id) {
        return Ok(false);
    }

    let locked = Progression::new(catalog, completed).is_lesson_locked(lesson_id);
    if locked {
        if enforce_order {
            return Err(PathwayError::lesson_locked(lesson_id));
        }
        tracing::warn!(lesson = lesson_id, "completing a locked lesson");
    }

    completed.insert(lesson_id.to_string());
    tracing::debug!(lesson = lesson_id, "lesson completed");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Category;
    use crate::core::recommend::{FirstUnlockedRecommender, FlaggedRecommender};

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn module(id: &str, lessons: &[&str]) -> Module {
        lessons.iter().fold(Module::new(id, id, Category::Ai), |m, l| {
            m.with_lesson(Lesson::new(*l, *l))
        })
    }

    fn three_module_catalog() -> Catalog {
        Catalog::new(
            vec![
                module("m1", &["a1", "a2"]),
                module("m2", &["b1", "b2", "b3"]).requires("m1").recommended(),
                module("m3", &["c1"]).requires("m1").requires("m2"),
            ],
            vec![],
        )
        .unwrap()
    }

    // =========================================================================
    // Lock state
    // =========================================================================

    #[test]
    fn test_no_prerequisites_never_locked() {
        let catalog = three_module_catalog();
        let locks = compute_lock_state(&catalog, &set(&[]));
        assert!(!locks.locked["m1"]);
    }

    #[test]
    fn test_locked_until_prerequisites_complete() {
        let catalog = three_module_catalog();

        let locks = compute_lock_state(&catalog, &set(&["a1"]));
        assert!(locks.locked["m2"]);
        assert!(locks.locked["m3"]);

        let locks = compute_lock_state(&catalog, &set(&["a1", "a2"]));
        assert!(!locks.locked["m2"]);
        assert!(locks.locked["m3"]);

        let locks = compute_lock_state(&catalog, &set(&["a1", "a2", "b1", "b2", "b3"]));
        assert!(!locks.locked["m3"]);
        assert!(locks.cycle_warning().is_none());
    }

    #[test]
    fn test_scenario_completed_prerequisite_unlocks() {
        let catalog = Catalog::new(
            vec![
                module("M1", &["l1"]),
                module("M2", &["l2"]).requires("M1"),
            ],
            vec![],
        )
        .unwrap();
        let completed = set(&["l1"]);
        let progression = Progression::new(&catalog, &completed);

        assert!(!progression.is_module_locked("M2"));
        // Overall progress is the mean of per-module progress, not a lesson
        // ratio: (M1 = 100 + M2 = 0) / 2 modules.
        assert_eq!(progression.overall_progress(), 50);
    }

    #[test]
    fn test_cycle_members_locked_and_reported() {
        let catalog = Catalog::new(
            vec![
                module("root", &["r1"]),
                module("x", &["x1"]).requires("y"),
                module("y", &["y1"]).requires("x"),
                module("after", &["z1"]).requires("x"),
            ],
            vec![],
        )
        .unwrap();

        // Even with every lesson done, cycle members stay locked.
        let completed = set(&["r1", "x1", "y1"]);
        let locks = compute_lock_state(&catalog, &completed);

        assert!(!locks.locked["root"]);
        assert!(locks.locked["x"]);
        assert!(locks.locked["y"]);
        assert!(!locks.locked["after"], "x is completed, so its dependent unlocks");
        assert_eq!(locks.cycle_members, set(&["x", "y"]));

        let warning = locks.cycle_warning().unwrap();
        assert!(warning.is_warning());
        assert!(warning.to_string().contains("x, y"));
    }

    #[test]
    fn test_cycle_detected_through_side_path() {
        // a -> d -> c -> a, plus a -> b -> c
        let catalog = Catalog::new(
            vec![
                module("a", &[]).requires("b").requires("d"),
                module("b", &[]).requires("c"),
                module("c", &[]).requires("a"),
                module("d", &[]).requires("c"),
            ],
            vec![],
        )
        .unwrap();
        let locks = compute_lock_state(&catalog, &set(&[]));
        assert_eq!(locks.cycle_members, set(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_self_cycle() {
        let catalog = Catalog::new(vec![module("m", &["l"]).requires("m")], vec![]).unwrap();
        let locks = compute_lock_state(&catalog, &set(&["l"]));
        assert!(locks.locked["m"]);
        assert_eq!(locks.cycle_members, set(&["m"]));
    }

    // =========================================================================
    // Progress
    // =========================================================================

    #[test]
    fn test_scenario_half_done_module() {
        let m1 = module("M1", &["l1", "l2"]);
        let completed = set(&["l1"]);
        assert_eq!(compute_module_progress(&m1, &completed), 50);
        assert!(!module_completed(&m1, &completed));
    }

    #[test]
    fn test_module_progress_rounds() {
        let m = module("m", &["a", "b", "c"]);
        assert_eq!(compute_module_progress(&m, &set(&["a"])), 33);
        assert_eq!(compute_module_progress(&m, &set(&["a", "b"])), 67);
        assert_eq!(compute_module_progress(&m, &set(&["a", "b", "c"])), 100);
    }

    #[test]
    fn test_empty_module_progress_zero_but_completed() {
        let catalog = Catalog::new(vec![module("empty", &[])], vec![]).unwrap();
        let completed = set(&[]);
        let progression = Progression::new(&catalog, &completed);
        let m = catalog.module("empty").unwrap();

        assert_eq!(progression.module_progress(m), 0);
        assert!(progression.is_module_completed(m));
        assert_eq!(progression.overall_progress(), 100);
    }

    #[test]
    fn test_overall_progress_empty_catalog() {
        let catalog = Catalog::default();
        assert_eq!(compute_overall_progress(&catalog, &set(&[])), 0);
    }

    #[test]
    fn test_overall_progress_average() {
        let catalog = three_module_catalog();
        // m1: 100, m2: 33, m3: 0 -> 133 / 3 = 44.33
        let completed = set(&["a1", "a2", "b1"]);
        assert_eq!(compute_overall_progress(&catalog, &completed), 44);
    }

    // =========================================================================
    // Lessons and status
    // =========================================================================

    #[test]
    fn test_lessons_gate_sequentially() {
        let catalog = three_module_catalog();
        let completed = set(&["a1", "a2", "b1"]);
        let progression = Progression::new(&catalog, &completed);
        let m2 = catalog.module("m2").unwrap();

        assert_eq!(progression.lesson_lock_state(m2), vec![false, false, true]);
        assert!(progression.is_lesson_locked("b3"));
        assert!(!progression.is_lesson_locked("b2"));
    }

    #[test]
    fn test_locked_module_locks_all_lessons() {
        let catalog = three_module_catalog();
        let completed = set(&[]);
        let progression = Progression::new(&catalog, &completed);
        let m3 = catalog.module("m3").unwrap();

        assert_eq!(progression.lesson_lock_state(m3), vec![true]);
    }

    #[test]
    fn test_module_status_transitions() {
        let catalog = three_module_catalog();
        let m1 = catalog.module("m1").unwrap();
        let m2 = catalog.module("m2").unwrap();

        let none = set(&[]);
        let p = Progression::new(&catalog, &none);
        assert_eq!(p.module_status(m1), ModuleStatus::NotStarted);
        assert_eq!(p.module_status(m2), ModuleStatus::Locked);

        let some = set(&["a1"]);
        let p = Progression::new(&catalog, &some);
        assert_eq!(p.module_status(m1), ModuleStatus::InProgress);

        let done = set(&["a1", "a2"]);
        let p = Progression::new(&catalog, &done);
        assert_eq!(p.module_status(m1), ModuleStatus::Completed);
        assert_eq!(p.module_status(m2), ModuleStatus::NotStarted);
    }

    // =========================================================================
    // Recommendation
    // =========================================================================

    #[test]
    fn test_recommendation_none_while_flagged_module_locked() {
        let catalog = three_module_catalog();
        let completed = set(&["a1"]);
        let progression = Progression::new(&catalog, &completed);

        assert!(progression
            .select_recommendation(&FlaggedRecommender)
            .is_none());
    }

    #[test]
    fn test_recommendation_first_open_lesson() {
        let catalog = three_module_catalog();
        let completed = set(&["a1", "a2", "b1"]);
        let progression = Progression::new(&catalog, &completed);

        let (module, lesson) = progression
            .select_recommendation(&FlaggedRecommender)
            .unwrap();
        assert_eq!(module.id, "m2");
        assert_eq!(lesson.id, "b2");
    }

    #[test]
    fn test_recommendation_none_when_module_finished() {
        let catalog = three_module_catalog();
        let completed = set(&["a1", "a2", "b1", "b2", "b3"]);
        let progression = Progression::new(&catalog, &completed);

        assert!(progression
            .select_recommendation(&FlaggedRecommender)
            .is_none());
    }

    #[test]
    fn test_recommendation_ignores_strategy_picking_locked_module() {
        let catalog = three_module_catalog();
        let completed = set(&[]);
        let progression = Progression::new(&catalog, &completed);
        let pick_m3 = |_: &Progression<'_>| Some("m3".to_string());

        assert!(progression.select_recommendation(&pick_m3).is_none());
    }

    #[test]
    fn test_view_flags_single_recommended_module() {
        let catalog = three_module_catalog();
        let completed = set(&["a1", "a2"]);
        let progression = Progression::new(&catalog, &completed);
        let view = progression.view(&FlaggedRecommender);

        let flagged: Vec<_> = view.modules.iter().filter(|m| m.is_recommended).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, "m2");
        assert_eq!(view.recommendation.as_ref().unwrap().lesson_id, "b1");
        assert_eq!(view.overall_progress, 33);
        assert!(view.warnings.is_empty());
    }

    #[test]
    fn test_view_with_other_strategy() {
        let catalog = three_module_catalog();
        let completed = set(&[]);
        let progression = Progression::new(&catalog, &completed);
        let view = progression.view(&FirstUnlockedRecommender);

        assert_eq!(view.recommendation.as_ref().unwrap().lesson_id, "a1");
        assert!(view.module("m1").unwrap().is_recommended);
    }

    #[test]
    fn test_total_xp_includes_module_bonus() {
        let catalog = Catalog::new(
            vec![Module::new("m", "m", Category::Blockchain)
                .with_xp(100)
                .with_lesson(Lesson::new("l1", "a").with_xp(10))
                .with_lesson(Lesson::new("l2", "b").with_xp(20))],
            vec![],
        )
        .unwrap();

        let partial = set(&["l1"]);
        assert_eq!(Progression::new(&catalog, &partial).total_xp_earned(), 10);

        let full = set(&["l1", "l2"]);
        assert_eq!(Progression::new(&catalog, &full).total_xp_earned(), 130);
    }

    // =========================================================================
    // complete_lesson
    // =========================================================================

    #[test]
    fn test_complete_lesson_unknown() {
        let catalog = three_module_catalog();
        let mut completed = set(&["a1"]);
        let result = complete_lesson(&catalog, &mut completed, "ghost", true);

        assert!(matches!(result, Err(PathwayError::UnknownLesson { .. })));
        assert_eq!(completed, set(&["a1"]));
    }

    #[test]
    fn test_complete_lesson_idempotent() {
        let catalog = three_module_catalog();
        let mut completed = set(&[]);

        assert!(complete_lesson(&catalog, &mut completed, "a1", true).unwrap());
        assert!(!complete_lesson(&catalog, &mut completed, "a1", true).unwrap());
        assert_eq!(completed, set(&["a1"]));
    }

    #[test]
    fn test_complete_locked_lesson_allowed_when_order_not_enforced() {
        let catalog = three_module_catalog();
        let mut completed = set(&[]);

        assert!(complete_lesson(&catalog, &mut completed, "a2", false).unwrap());
        assert!(completed.contains("a2"));
    }

    #[test]
    fn test_complete_locked_lesson_refused_when_enforced() {
        let catalog = three_module_catalog();
        let mut completed = set(&[]);
        let result = complete_lesson(&catalog, &mut completed, "a2", true);

        assert!(matches!(result, Err(PathwayError::LessonLocked { .. })));
        assert!(completed.is_empty());
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Random DAG: module i may only require modules with a lower index.
        fn arb_dag() -> impl Strategy<Value = (Catalog, Vec<String>)> {
            (1usize..7)
                .prop_flat_map(|n| {
                    (
                        Just(n),
                        prop::collection::vec(prop::collection::vec(any::<bool>(), n), n),
                        prop::collection::vec(0usize..4, n),
                    )
                })
                .prop_map(|(n, edges, lesson_counts)| {
                    let mut lesson_ids = Vec::new();
                    let modules = (0..n)
                        .map(|i| {
                            let mut m = Module::new(format!("m{}", i), "m", Category::Ai);
                            for (j, &edge) in edges[i].iter().enumerate().take(i) {
                                if edge {
                                    m = m.requires(format!("m{}", j));
                                }
                            }
                            for k in 0..lesson_counts[i] {
                                let id = format!("m{}-l{}", i, k);
                                lesson_ids.push(id.clone());
                                m = m.with_lesson(Lesson::new(id, "l"));
                            }
                            m
                        })
                        .collect();
                    (Catalog::new(modules, vec![]).unwrap(), lesson_ids)
                })
        }

        fn arb_dag_with_completions() -> impl Strategy<Value = (Catalog, Vec<String>, Vec<bool>)>
        {
            arb_dag().prop_flat_map(|(catalog, lessons)| {
                let n = lessons.len();
                (
                    Just(catalog),
                    Just(lessons),
                    prop::collection::vec(any::<bool>(), n),
                )
            })
        }

        proptest! {
            // Property: locked iff some prerequisite is incomplete (empty prereqs never locked)
            #[test]
            fn prop_locked_iff_prerequisite_incomplete(
                (catalog, lessons, flags) in arb_dag_with_completions()
            ) {
                let completed: BTreeSet<String> = lessons
                    .iter()
                    .zip(&flags)
                    .filter(|(_, f)| **f)
                    .map(|(l, _)| l.clone())
                    .collect();
                let progression = Progression::new(&catalog, &completed);

                for m in catalog.modules() {
                    let expected = m.prerequisites.iter().any(|p| {
                        !progression.is_module_completed(catalog.module(p).unwrap())
                    });
                    prop_assert_eq!(progression.is_module_locked(&m.id), expected);
                    if m.prerequisites.is_empty() {
                        prop_assert!(!progression.is_module_locked(&m.id));
                    }
                }
                prop_assert!(progression.lock_state().cycle_members.is_empty());
            }

            // Property: completing lessons in order is never refused and
            // overall progress never decreases along the way
            #[test]
            fn prop_overall_progress_monotonic((catalog, lessons) in arb_dag()) {
                let mut completed: BTreeSet<String> = BTreeSet::new();
                let mut before = compute_overall_progress(&catalog, &completed);

                // Lessons are generated module by module, and modules only
                // require lower-indexed ones, so this walk is in unlock order.
                for lesson in &lessons {
                    prop_assert!(complete_lesson(&catalog, &mut completed, lesson, true).unwrap());
                    let after = compute_overall_progress(&catalog, &completed);
                    prop_assert!(after >= before);
                    prop_assert!(after <= 100);
                    before = after;
                }
                prop_assert_eq!(before, 100);
            }

            // Property: at most one module is flagged as recommended
            #[test]
            fn prop_at_most_one_recommended(
                (catalog, lessons, flags) in arb_dag_with_completions()
            ) {
                let completed: BTreeSet<String> = lessons
                    .iter()
                    .zip(&flags)
                    .filter(|(_, f)| **f)
                    .map(|(l, _)| l.clone())
                    .collect();
                let view = Progression::new(&catalog, &completed).view(&FirstUnlockedRecommender);
                let flagged = view.modules.iter().filter(|m| m.is_recommended).count();
                prop_assert!(flagged <= 1);
            }
        }
    }
}

//! Content catalog types for Pathway.
//!
//! The catalog is an immutable snapshot of modules, lessons, and daily
//! challenges supplied by a content source. Derived state (lock state,
//! progress, recommendation) is never read from content; it is computed
//! by [`crate::core::progression`].

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PathwayError, Result};

/// Subject area of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "AI")]
    Ai,
    #[serde(alias = "Blockchain")]
    Blockchain,
    #[serde(alias = "Product")]
    Product,
}

/// Difficulty of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    #[serde(alias = "Beginner")]
    Beginner,
    #[serde(alias = "Intermediate")]
    Intermediate,
    #[serde(alias = "Advanced")]
    Advanced,
}

/// Presentation type of a lesson. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    #[default]
    Video,
    Article,
    Quiz,
    Project,
    Interactive,
}

/// Presentation type of a challenge question. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    TrueFalse,
    QuickRead,
    Scenario,
}

impl QuestionType {
    /// Whether this question type requires a choice between options.
    pub fn is_choice(&self) -> bool {
        !matches!(self, QuestionType::QuickRead)
    }
}

/// Smallest completable unit inside a module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub lesson_type: LessonType,
    #[serde(default)]
    pub duration: String,
    /// Completion flag at snapshot time. Seeds the engine's completion set.
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub xp_reward: u32,
}

impl Lesson {
    /// Create an incomplete lesson.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            lesson_type: LessonType::default(),
            duration: String::new(),
            is_completed: false,
            xp_reward: 0,
        }
    }

    /// Mark the lesson as completed in the snapshot.
    pub fn completed(mut self) -> Self {
        self.is_completed = true;
        self
    }

    /// Set the XP reward.
    pub fn with_xp(mut self, xp: u32) -> Self {
        self.xp_reward = xp;
        self
    }
}

/// A unit of curriculum gated by prerequisite modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub xp_reward: u32,
    #[serde(default)]
    pub prerequisites: BTreeSet<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    /// Authoring flag read by the default recommendation strategy.
    #[serde(default, alias = "isRecommended")]
    pub recommended: bool,
}

impl Module {
    /// Create a module with no prerequisites and no lessons.
    pub fn new(id: impl Into<String>, title: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category,
            difficulty: Difficulty::default(),
            estimated_time: String::new(),
            xp_reward: 0,
            prerequisites: BTreeSet::new(),
            lessons: Vec::new(),
            skills: BTreeSet::new(),
            recommended: false,
        }
    }

    /// Add a prerequisite module id.
    pub fn requires(mut self, module_id: impl Into<String>) -> Self {
        self.prerequisites.insert(module_id.into());
        self
    }

    /// Append a lesson.
    pub fn with_lesson(mut self, lesson: Lesson) -> Self {
        self.lessons.push(lesson);
        self
    }

    /// Set the module XP reward.
    pub fn with_xp(mut self, xp: u32) -> Self {
        self.xp_reward = xp;
        self
    }

    /// Set the recommendation authoring flag.
    pub fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }

    /// Position of a lesson within this module.
    pub fn lesson_index(&self, lesson_id: &str) -> Option<usize> {
        self.lessons.iter().position(|l| l.id == lesson_id)
    }
}

/// A scored question inside a daily challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeQuestion {
    pub id: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    pub correct_option_index: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub points: u32,
}

impl ChallengeQuestion {
    /// Create a multiple-choice question.
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option_index: usize,
        points: u32,
    ) -> Self {
        Self {
            id: id.into(),
            question_type: QuestionType::MultipleChoice,
            prompt: prompt.into(),
            options,
            correct_option_index,
            explanation: String::new(),
            points,
        }
    }

    /// Attach an explanation shown after submit.
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Whether `option_index` is the correct answer.
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_option_index
    }
}

/// A timed, ordered sequence of scored questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyChallenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Base XP paid out for a perfect score.
    #[serde(default)]
    pub xp_reward: u32,
    /// XP added when the streak rule fires.
    #[serde(default)]
    pub streak_bonus: u32,
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
    pub questions: Vec<ChallengeQuestion>,
}

impl DailyChallenge {
    /// Create a challenge with no time limit and no rewards.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        questions: Vec<ChallengeQuestion>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            xp_reward: 0,
            streak_bonus: 0,
            time_limit_seconds: None,
            questions,
        }
    }

    /// Set base XP and streak bonus.
    pub fn with_rewards(mut self, xp_reward: u32, streak_bonus: u32) -> Self {
        self.xp_reward = xp_reward;
        self.streak_bonus = streak_bonus;
        self
    }

    /// Set the time limit.
    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit_seconds = Some(seconds);
        self
    }

    /// Sum of points over all questions.
    pub fn total_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |total, q| total.saturating_add(q.points))
    }
}

/// Validated content snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    #[serde(default)]
    modules: Vec<Module>,
    #[serde(default)]
    challenges: Vec<DailyChallenge>,
}

impl Catalog {
    /// Build a catalog, validating ids and question shapes.
    ///
    /// Prerequisite cycles are accepted here; progression reports them as
    /// warnings and keeps the affected modules locked.
    pub fn new(modules: Vec<Module>, challenges: Vec<DailyChallenge>) -> Result<Self> {
        let catalog = Self {
            modules,
            challenges,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse and validate a JSON catalog.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load and validate a JSON catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PathwayError::storage(path, e))?;
        Self::from_json(&content)
    }

    /// Modules in catalog order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Challenges in catalog order.
    pub fn challenges(&self) -> &[DailyChallenge] {
        &self.challenges
    }

    /// Look up a module by id.
    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Look up a challenge by id.
    pub fn challenge(&self, id: &str) -> Option<&DailyChallenge> {
        self.challenges.iter().find(|c| c.id == id)
    }

    /// Find the module owning a lesson and the lesson's position in it.
    pub fn find_lesson(&self, lesson_id: &str) -> Option<(&Module, usize)> {
        self.modules
            .iter()
            .find_map(|m| m.lesson_index(lesson_id).map(|idx| (m, idx)))
    }

    /// Lesson ids flagged completed in the snapshot.
    pub fn initial_completions(&self) -> BTreeSet<String> {
        self.modules
            .iter()
            .flat_map(|m| m.lessons.iter())
            .filter(|l| l.is_completed)
            .map(|l| l.id.clone())
            .collect()
    }

    fn validate(&self) -> Result<()> {
        let mut module_ids = HashSet::new();
        let mut lesson_ids = HashSet::new();

        for module in &self.modules {
            if !module_ids.insert(module.id.as_str()) {
                return Err(PathwayError::invalid_catalog(format!(
                    "duplicate module id '{}'",
                    module.id
                )));
            }
            for lesson in &module.lessons {
                if !lesson_ids.insert(lesson.id.as_str()) {
                    return Err(PathwayError::invalid_catalog(format!(
                        "duplicate lesson id '{}'",
                        lesson.id
                    )));
                }
            }
        }

        for module in &self.modules {
            if let Some(missing) = module
                .prerequisites
                .iter()
                .find(|p| !module_ids.contains(p.as_str()))
            {
                return Err(PathwayError::invalid_catalog(format!(
                    "module '{}' requires unknown module '{}'",
                    module.id, missing
                )));
            }
        }

        let mut challenge_ids = HashSet::new();
        for challenge in &self.challenges {
            if !challenge_ids.insert(challenge.id.as_str()) {
                return Err(PathwayError::invalid_catalog(format!(
                    "duplicate challenge id '{}'",
                    challenge.id
                )));
            }
            validate_questions(challenge)?;
        }

        Ok(())
    }
}

fn validate_questions(challenge: &DailyChallenge) -> Result<()> {
    let mut question_ids = HashSet::new();
    let mut total_points = 0u32;
    for question in &challenge.questions {
        total_points = total_points.checked_add(question.points).ok_or_else(|| {
            PathwayError::invalid_catalog(format!(
                "challenge '{}' point total overflows",
                challenge.id
            ))
        })?;
        if !question_ids.insert(question.id.as_str()) {
            return Err(PathwayError::invalid_catalog(format!(
                "challenge '{}' has duplicate question id '{}'",
                challenge.id, question.id
            )));
        }
        if question.question_type.is_choice() && question.options.len() < 2 {
            return Err(PathwayError::invalid_catalog(format!(
                "question '{}' needs at least 2 options, has {}",
                question.id,
                question.options.len()
            )));
        }
        if question.correct_option_index >= question.options.len() {
            return Err(PathwayError::invalid_catalog(format!(
                "question '{}' marks option {} correct but has {} options",
                question.id,
                question.correct_option_index,
                question.options.len()
            )));
        }
    }
    Ok(())
}

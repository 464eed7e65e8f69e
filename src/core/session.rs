//! Challenge session state machine for Pathway.
//!
//! A session walks one daily challenge question by question:
//!
//! ```text
//! AwaitingAnswer --submit--> ShowingExplanation --advance--> AwaitingAnswer
//!                                                \--advance (last)--> Finished
//! ```
//!
//! Every transition validates before it mutates, so a failed call leaves the
//! session exactly as it was.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::catalog::{ChallengeQuestion, DailyChallenge};
use crate::core::reward::{RewardOutcome, RewardPolicy};
use crate::error::{PathwayError, Result};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Current question is open for selection.
    #[default]
    AwaitingAnswer,
    /// Answer submitted, explanation visible.
    ShowingExplanation,
    /// All questions answered, reward computed.
    Finished,
}

impl SessionPhase {
    /// Human-readable name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::AwaitingAnswer => "AwaitingAnswer",
            SessionPhase::ShowingExplanation => "ShowingExplanation",
            SessionPhase::Finished => "Finished",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Finished)
    }
}

/// Outcome of one submitted question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: String,
    pub option_index: usize,
    pub correct: bool,
    pub points_awarded: u32,
}

/// Live progress through one challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSession {
    pub challenge_id: String,
    pub question_cursor: usize,
    /// Question id to chosen option. At most one entry per question.
    pub answers: BTreeMap<String, usize>,
    pub accumulated_score: u32,
    pub phase: SessionPhase,
    /// Submitted questions in order.
    pub results: Vec<QuestionResult>,
    pub reward: Option<RewardOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ChallengeSession {
    /// Seconds left before the challenge time limit, if it has one.
    pub fn remaining_seconds(&self, challenge: &DailyChallenge, now: DateTime<Utc>) -> Option<u32> {
        let limit = i64::from(challenge.time_limit_seconds?);
        let elapsed = now
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0);
        Some((limit - elapsed).max(0) as u32)
    }

    /// Correctness of a question once submitted.
    pub fn result_for(&self, question_id: &str) -> Option<&QuestionResult> {
        self.results.iter().find(|r| r.question_id == question_id)
    }
}

/// Start a session on `challenge`.
///
/// Fails with `EmptyChallenge` when the challenge has no questions.
pub fn start_session(challenge: &DailyChallenge) -> Result<ChallengeSession> {
    if challenge.questions.is_empty() {
        return Err(PathwayError::empty_challenge(&challenge.id));
    }

    tracing::debug!(challenge = %challenge.id, "session started");
    Ok(ChallengeSession {
        challenge_id: challenge.id.clone(),
        question_cursor: 0,
        answers: BTreeMap::new(),
        accumulated_score: 0,
        phase: SessionPhase::AwaitingAnswer,
        results: Vec::new(),
        reward: None,
        started_at: Utc::now(),
        finished_at: None,
    })
}

/// Transition driver for a session.
///
/// Borrows the session mutably together with the challenge it runs on, the
/// reward policy, and the learner's current streak (used when the session
/// finishes).
#[derive(Debug)]
pub struct Assessment<'a> {
    session: &'a mut ChallengeSession,
    challenge: &'a DailyChallenge,
    policy: RewardPolicy,
    current_streak: u32,
}

impl<'a> Assessment<'a> {
    /// Create a new driver. `challenge` must be the session's challenge.
    pub fn new(
        session: &'a mut ChallengeSession,
        challenge: &'a DailyChallenge,
        policy: RewardPolicy,
        current_streak: u32,
    ) -> Self {
        debug_assert_eq!(session.challenge_id, challenge.id);
        Self {
            session,
            challenge,
            policy,
            current_streak,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    /// The question under the cursor.
    ///
    /// Fails when the cursor is past the challenge's questions, which happens
    /// when a persisted session outlives an edit to its challenge.
    pub fn current_question(&self) -> Result<&'a ChallengeQuestion> {
        self.challenge
            .questions
            .get(self.session.question_cursor)
            .ok_or_else(|| {
                PathwayError::stale_session(&self.challenge.id, self.session.question_cursor)
            })
    }

    /// Option currently selected for the question under the cursor.
    pub fn selected_option(&self) -> Option<usize> {
        let question = self.current_question().ok()?;
        self.session.answers.get(&question.id).copied()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Record a selection for the current question.
    ///
    /// Replaces an earlier selection until the answer is submitted.
    pub fn select_answer(&mut self, option_index: usize) -> Result<()> {
        if self.session.phase != SessionPhase::AwaitingAnswer {
            return Err(PathwayError::invalid_phase(
                "select an answer",
                self.session.phase.name(),
            ));
        }

        let question = self.current_question()?;
        if option_index >= question.options.len() {
            return Err(PathwayError::InvalidOptionIndex {
                index: option_index,
                len: question.options.len(),
            });
        }

        self.session
            .answers
            .insert(question.id.clone(), option_index);
        Ok(())
    }

    /// Transition: AwaitingAnswer → ShowingExplanation
    ///
    /// Scores the recorded selection. Returns whether it was correct.
    pub fn submit_answer(&mut self) -> Result<bool> {
        if self.session.phase != SessionPhase::AwaitingAnswer {
            return Err(PathwayError::invalid_phase(
                "submit an answer",
                self.session.phase.name(),
            ));
        }

        let question = self.current_question()?;
        let option_index = self
            .selected_option()
            .ok_or_else(|| PathwayError::no_answer_selected(&question.id))?;

        let correct = question.is_correct(option_index);
        let points_awarded = if correct { question.points } else { 0 };

        self.session.accumulated_score = self
            .session
            .accumulated_score
            .saturating_add(points_awarded);
        self.session.results.push(QuestionResult {
            question_id: question.id.clone(),
            option_index,
            correct,
            points_awarded,
        });
        self.session.phase = SessionPhase::ShowingExplanation;

        tracing::debug!(
            question = %question.id,
            correct,
            score = self.session.accumulated_score,
            "answer submitted"
        );
        Ok(correct)
    }

    /// Transition: ShowingExplanation → AwaitingAnswer | Finished
    ///
    /// On the last question, finishes the session and computes the reward.
    /// A no-op once finished.
    pub fn advance(&mut self) -> Result<()> {
        match self.session.phase {
            SessionPhase::Finished => Ok(()),
            SessionPhase::AwaitingAnswer => Err(PathwayError::invalid_phase(
                "advance",
                self.session.phase.name(),
            )),
            SessionPhase::ShowingExplanation => {
                if self.session.question_cursor + 1 >= self.challenge.questions.len() {
                    self.finish();
                } else {
                    self.session.question_cursor += 1;
                    self.session.phase = SessionPhase::AwaitingAnswer;
                }
                Ok(())
            }
        }
    }

    fn finish(&mut self) {
        let reward = self.policy.compute(
            self.session.accumulated_score,
            self.challenge.total_points(),
            self.challenge.xp_reward,
            self.current_streak,
            self.challenge.streak_bonus,
        );

        self.session.reward = Some(reward);
        self.session.phase = SessionPhase::Finished;
        self.session.finished_at = Some(Utc::now());

        tracing::debug!(
            challenge = %self.challenge.id,
            raw_score = reward.raw_score,
            xp = reward.xp_awarded,
            "session finished"
        );
    }
}

/// Current question as shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub selected_option: Option<usize>,
    /// Present only while the explanation is showing.
    pub correct_option_index: Option<usize>,
    pub explanation: Option<String>,
}

/// Session view model handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub challenge_id: String,
    pub challenge_title: String,
    pub phase: SessionPhase,
    pub question_cursor: usize,
    pub total_questions: usize,
    pub accumulated_score: u32,
    pub total_possible_points: u32,
    pub current_question: Option<QuestionView>,
    pub results: Vec<QuestionResult>,
    pub remaining_seconds: Option<u32>,
    pub reward: Option<RewardOutcome>,
}

impl SessionView {
    /// Build the view for `session` at time `now`.
    pub fn new(session: &ChallengeSession, challenge: &DailyChallenge, now: DateTime<Utc>) -> Self {
        let current_question = if session.phase.is_terminal() {
            None
        } else {
            challenge
                .questions
                .get(session.question_cursor)
                .map(|q| {
                    let revealed = session.phase == SessionPhase::ShowingExplanation;
                    QuestionView {
                        id: q.id.clone(),
                        prompt: q.prompt.clone(),
                        options: q.options.clone(),
                        selected_option: session.answers.get(&q.id).copied(),
                        correct_option_index: revealed.then_some(q.correct_option_index),
                        explanation: revealed.then(|| q.explanation.clone()),
                    }
                })
        };

        Self {
            challenge_id: challenge.id.clone(),
            challenge_title: challenge.title.clone(),
            phase: session.phase,
            question_cursor: session.question_cursor,
            total_questions: challenge.questions.len(),
            accumulated_score: session.accumulated_score,
            total_possible_points: challenge.total_points(),
            current_question,
            results: session.results.clone(),
            remaining_seconds: session.remaining_seconds(challenge, now),
            reward: session.reward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn two_question_challenge() -> DailyChallenge {
        DailyChallenge::new(
            "daily",
            "Daily check",
            vec![
                ChallengeQuestion::new(
                    "q1",
                    "What does LLM stand for?",
                    vec!["Large Language Model".into(), "Low Level Machine".into()],
                    0,
                    25,
                )
                .with_explanation("Large Language Model."),
                ChallengeQuestion::new(
                    "q2",
                    "Blocks link by?",
                    vec!["Hashes".into(), "Names".into(), "Dates".into()],
                    0,
                    30,
                ),
            ],
        )
        .with_rewards(100, 25)
    }

    fn drive<'a>(
        session: &'a mut ChallengeSession,
        challenge: &'a DailyChallenge,
        streak: u32,
    ) -> Assessment<'a> {
        Assessment::new(session, challenge, RewardPolicy::default(), streak)
    }

    #[test]
    fn test_start_session_initial_state() {
        let challenge = two_question_challenge();
        let session = start_session(&challenge).unwrap();

        assert_eq!(session.phase, SessionPhase::AwaitingAnswer);
        assert_eq!(session.question_cursor, 0);
        assert!(session.answers.is_empty());
        assert_eq!(session.accumulated_score, 0);
        assert!(session.reward.is_none());
    }

    #[test]
    fn test_start_empty_challenge_fails() {
        let challenge = DailyChallenge::new("empty", "Empty", vec![]);
        let result = start_session(&challenge);
        assert!(matches!(result, Err(PathwayError::EmptyChallenge { .. })));
    }

    #[test]
    fn test_scenario_one_right_one_wrong() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();

        {
            let mut a = drive(&mut session, &challenge, 7);
            a.select_answer(0).unwrap();
            assert!(a.submit_answer().unwrap());
            a.advance().unwrap();
            a.select_answer(2).unwrap();
            assert!(!a.submit_answer().unwrap());
            a.advance().unwrap();
        }

        assert_eq!(session.accumulated_score, 25);
        assert_eq!(session.phase, SessionPhase::Finished);
        assert!(session.finished_at.is_some());

        let reward = session.reward.unwrap();
        assert_eq!(reward.raw_score, 45);
        assert_eq!(reward.xp_awarded, 70);
        assert!(reward.streak_bonus_applied);

        assert!(session.result_for("q1").unwrap().correct);
        assert!(!session.result_for("q2").unwrap().correct);
    }

    #[test]
    fn test_scenario_reselect_before_submit() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();

        {
            let mut a = drive(&mut session, &challenge, 0);
            a.select_answer(1).unwrap();
            a.select_answer(0).unwrap();
            assert_eq!(a.selected_option(), Some(0));
            assert!(a.submit_answer().unwrap());
        }

        assert_eq!(session.answers.len(), 1);
        assert_eq!(session.answers["q1"], 0);
        assert_eq!(session.accumulated_score, 25);
    }

    #[test]
    fn test_scenario_submit_without_selection() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();
        let before = session.clone();

        let result = drive(&mut session, &challenge, 0).submit_answer();

        assert!(matches!(result, Err(PathwayError::NoAnswerSelected { .. })));
        assert_eq!(session, before);
    }

    #[test]
    fn test_select_out_of_range() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();
        let before = session.clone();

        let result = drive(&mut session, &challenge, 0).select_answer(2);

        assert!(matches!(
            result,
            Err(PathwayError::InvalidOptionIndex { index: 2, len: 2 })
        ));
        assert_eq!(session, before);
    }

    #[test]
    fn test_cursor_past_last_question_is_an_error() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();
        session.question_cursor = 5;
        let before = session.clone();

        let mut a = drive(&mut session, &challenge, 0);
        assert!(matches!(
            a.current_question(),
            Err(PathwayError::StaleSession {
                question_cursor: 5,
                ..
            })
        ));
        assert_eq!(a.selected_option(), None);
        assert!(matches!(
            a.select_answer(0),
            Err(PathwayError::StaleSession { .. })
        ));
        assert!(matches!(
            a.submit_answer(),
            Err(PathwayError::StaleSession { .. })
        ));
        drop(a);
        assert_eq!(session, before);
    }

    #[test]
    fn test_select_while_showing_explanation_fails() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();
        let mut a = drive(&mut session, &challenge, 0);
        a.select_answer(1).unwrap();
        a.submit_answer().unwrap();

        let result = a.select_answer(0);
        assert!(matches!(result, Err(PathwayError::InvalidPhase { .. })));
        // Submitted answer is immutable.
        assert_eq!(a.selected_option(), Some(1));
    }

    #[test]
    fn test_submit_twice_fails() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();
        let mut a = drive(&mut session, &challenge, 0);
        a.select_answer(0).unwrap();
        a.submit_answer().unwrap();

        assert!(matches!(
            a.submit_answer(),
            Err(PathwayError::InvalidPhase { .. })
        ));
        drop(a);
        assert_eq!(session.accumulated_score, 25);
    }

    #[test]
    fn test_advance_while_awaiting_fails() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();
        let result = drive(&mut session, &challenge, 0).advance();
        assert!(matches!(result, Err(PathwayError::InvalidPhase { .. })));
        assert_eq!(session.question_cursor, 0);
    }

    #[test]
    fn test_advance_after_finished_is_noop() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();
        {
            let mut a = drive(&mut session, &challenge, 0);
            for _ in 0..2 {
                a.select_answer(0).unwrap();
                a.submit_answer().unwrap();
                a.advance().unwrap();
            }
        }
        let finished = session.clone();

        drive(&mut session, &challenge, 0).advance().unwrap();
        drive(&mut session, &challenge, 0).advance().unwrap();

        assert_eq!(session, finished);
    }

    #[test]
    fn test_finished_rejects_answers() {
        let challenge = DailyChallenge::new(
            "one",
            "One",
            vec![ChallengeQuestion::new("q", "?", vec!["a".into(), "b".into()], 1, 10)],
        );
        let mut session = start_session(&challenge).unwrap();
        let mut a = drive(&mut session, &challenge, 0);
        a.select_answer(1).unwrap();
        a.submit_answer().unwrap();
        a.advance().unwrap();

        assert_eq!(a.phase(), SessionPhase::Finished);
        assert!(matches!(
            a.select_answer(0),
            Err(PathwayError::InvalidPhase { .. })
        ));
        assert!(matches!(
            a.submit_answer(),
            Err(PathwayError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_independent_sessions_do_not_share_state() {
        let challenge = two_question_challenge();
        let mut first = start_session(&challenge).unwrap();
        let mut second = start_session(&challenge).unwrap();

        {
            let mut a = drive(&mut first, &challenge, 0);
            a.select_answer(0).unwrap();
            a.submit_answer().unwrap();
        }

        assert_eq!(first.accumulated_score, 25);
        assert_eq!(second.accumulated_score, 0);
        assert!(second.answers.is_empty());

        drive(&mut second, &challenge, 0).select_answer(1).unwrap();
        assert_eq!(first.answers["q1"], 0);
    }

    #[test]
    fn test_remaining_seconds() {
        let challenge = two_question_challenge().with_time_limit(300);
        let session = start_session(&challenge).unwrap();

        let later = session.started_at + Duration::seconds(100);
        assert_eq!(session.remaining_seconds(&challenge, later), Some(200));

        let way_later = session.started_at + Duration::seconds(1000);
        assert_eq!(session.remaining_seconds(&challenge, way_later), Some(0));

        let untimed = two_question_challenge();
        assert_eq!(session.remaining_seconds(&untimed, later), None);
    }

    #[test]
    fn test_view_reveals_explanation_only_after_submit() {
        let challenge = two_question_challenge();
        let mut session = start_session(&challenge).unwrap();
        drive(&mut session, &challenge, 0).select_answer(1).unwrap();

        let view = SessionView::new(&session, &challenge, Utc::now());
        let q = view.current_question.as_ref().unwrap();
        assert_eq!(q.selected_option, Some(1));
        assert!(q.explanation.is_none());
        assert!(q.correct_option_index.is_none());
        assert_eq!(view.total_possible_points, 55);

        drive(&mut session, &challenge, 0).submit_answer().unwrap();
        let view = SessionView::new(&session, &challenge, Utc::now());
        let q = view.current_question.unwrap();
        assert_eq!(q.explanation.as_deref(), Some("Large Language Model."));
        assert_eq!(q.correct_option_index, Some(0));
        assert_eq!(view.results.len(), 1);
    }

    #[test]
    fn test_phase_name() {
        assert_eq!(SessionPhase::AwaitingAnswer.name(), "AwaitingAnswer");
        assert!(SessionPhase::Finished.is_terminal());
        assert!(!SessionPhase::ShowingExplanation.is_terminal());
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone, Copy)]
        enum Step {
            Select(usize),
            Submit,
            Advance,
        }

        fn arb_step() -> impl Strategy<Value = Step> {
            prop_oneof![
                (0usize..4).prop_map(Step::Select),
                Just(Step::Submit),
                Just(Step::Advance),
            ]
        }

        proptest! {
            // Property: only submit raises the score, by exactly 0 or the question's points
            #[test]
            fn prop_score_only_moves_on_submit(
                steps in prop::collection::vec(arb_step(), 0..40)
            ) {
                let challenge = two_question_challenge();
                let mut session = start_session(&challenge).unwrap();

                for step in steps {
                    let before = session.accumulated_score;
                    let cursor = session.question_cursor;
                    let mut a = drive(&mut session, &challenge, 0);
                    let submitted = match step {
                        Step::Select(i) => { let _ = a.select_answer(i); false }
                        Step::Submit => a.submit_answer().is_ok(),
                        Step::Advance => { let _ = a.advance(); false }
                    };
                    drop(a);

                    let delta = session.accumulated_score - before;
                    if submitted {
                        let points = challenge.questions[cursor].points;
                        prop_assert!(delta == 0 || delta == points);
                    } else {
                        prop_assert_eq!(delta, 0);
                    }
                }
            }

            // Property: advancing a finished session changes nothing
            #[test]
            fn prop_finished_is_terminal(answers in prop::collection::vec(0usize..2, 2), extra in 1usize..5) {
                let challenge = two_question_challenge();
                let mut session = start_session(&challenge).unwrap();
                {
                    let mut a = drive(&mut session, &challenge, 0);
                    for answer in answers {
                        a.select_answer(answer).unwrap();
                        a.submit_answer().unwrap();
                        a.advance().unwrap();
                    }
                }
                let score = session.accumulated_score;
                for _ in 0..extra {
                    drive(&mut session, &challenge, 0).advance().unwrap();
                }
                prop_assert_eq!(session.phase, SessionPhase::Finished);
                prop_assert_eq!(session.accumulated_score, score);
            }
        }
    }
}

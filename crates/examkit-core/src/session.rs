//! The exam session state machine.
//!
//! A session moves `InProgress → Submitting → Completed` exactly once, either
//! through [`ExamSession::submit`] or when [`ExamSession::tick`] runs the clock
//! down to zero. Both paths produce the same [`Submission`], which the results
//! consumer passes to [`score`](crate::scoring::score).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, ValidationError};
use crate::model::{ExamDefinition, Question};
use crate::scoring::percent;

/// Recorded answers: question id → chosen option index.
pub type Answers = HashMap<String, usize>;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InProgress,
    Submitting,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::InProgress => write!(f, "in progress"),
            Phase::Submitting => write!(f, "submitting"),
            Phase::Completed => write!(f, "completed"),
        }
    }
}

/// Why a session was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    Manual,
    TimeExpired,
}

/// The final answer set handed to the results consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub exam_id: String,
    pub answers: Answers,
    pub reason: SubmitReason,
    pub remaining_seconds: u64,
    pub elapsed_seconds: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Result of one clock tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time was deducted and the session is still running.
    Running { remaining_seconds: u64 },
    /// The clock hit zero and the session auto-submitted.
    Expired(Submission),
    /// The session is not in progress; nothing happened.
    Idle,
}

/// One student's in-progress attempt at an exam.
#[derive(Debug)]
pub struct ExamSession {
    definition: Arc<ExamDefinition>,
    current_index: usize,
    answers: Answers,
    remaining_seconds: u64,
    phase: Phase,
    started_at: DateTime<Utc>,
    pending_reason: Option<SubmitReason>,
    submission: Option<Submission>,
}

impl ExamSession {
    /// Start a new attempt at the first question with the full time budget.
    pub fn start(definition: Arc<ExamDefinition>) -> Result<Self, ValidationError> {
        if definition.total_questions() == 0 {
            return Err(ValidationError::EmptyExam(definition.id.clone()));
        }

        tracing::info!(
            exam_id = %definition.id,
            questions = definition.total_questions(),
            time_budget_secs = definition.total_time_budget_seconds,
            "exam session started"
        );

        Ok(Self {
            remaining_seconds: definition.total_time_budget_seconds,
            definition,
            current_index: 0,
            answers: HashMap::new(),
            phase: Phase::InProgress,
            started_at: Utc::now(),
            pending_reason: None,
            submission: None,
        })
    }

    fn require_in_progress(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.phase == Phase::InProgress {
            Ok(())
        } else {
            tracing::warn!(phase = %self.phase, "rejected attempt to {operation}");
            Err(SessionError::InvalidTransition {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Move to a question by flat index, clamped into range.
    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.require_in_progress("navigate")?;
        let last = self.definition.total_questions() - 1;
        self.current_index = index.min(last);
        tracing::debug!(index = self.current_index, "navigated");
        Ok(self.current_index)
    }

    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current_index.saturating_add(1))
    }

    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current_index.saturating_sub(1))
    }

    /// Record (or overwrite) the chosen option for a question.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        option_index: usize,
    ) -> Result<(), SessionError> {
        self.require_in_progress("record an answer")?;
        let question = self
            .definition
            .question(question_id)
            .ok_or_else(|| ValidationError::UnknownQuestion(question_id.to_string()))?;
        question.check_option(option_index)?;

        self.answers.insert(question.id.clone(), option_index);
        tracing::debug!(question_id, option_index, "answer recorded");
        Ok(())
    }

    /// Record an answer for the question currently shown.
    pub fn answer_current(&mut self, option_index: usize) -> Result<(), SessionError> {
        self.require_in_progress("record an answer")?;
        let id = match self.current_question() {
            Some(q) => q.id.clone(),
            None => return Err(ValidationError::EmptyExam(self.definition.id.clone()).into()),
        };
        self.record_answer(&id, option_index)
    }

    /// Advance the clock by one second, auto-submitting at zero.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::InProgress {
            return TickOutcome::Idle;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Running {
                remaining_seconds: self.remaining_seconds,
            };
        }

        tracing::info!(exam_id = %self.definition.id, "time expired, auto-submitting");
        self.begin(SubmitReason::TimeExpired);
        match self.complete_submission() {
            Ok(submission) => TickOutcome::Expired(submission),
            Err(_) => TickOutcome::Idle,
        }
    }

    /// Submit the session. A second call is rejected and changes nothing.
    pub fn submit(&mut self) -> Result<Submission, SessionError> {
        self.begin_submit()?;
        self.complete_submission()
    }

    /// First half of [`submit`](Self::submit): stop accepting input.
    pub fn begin_submit(&mut self) -> Result<(), SessionError> {
        self.require_in_progress("submit")?;
        self.begin(SubmitReason::Manual);
        Ok(())
    }

    fn begin(&mut self, reason: SubmitReason) {
        self.phase = Phase::Submitting;
        self.pending_reason = Some(reason);
    }

    /// Second half of [`submit`](Self::submit): seal the answers.
    pub fn complete_submission(&mut self) -> Result<Submission, SessionError> {
        if self.phase != Phase::Submitting {
            return Err(SessionError::InvalidTransition {
                operation: "complete submission",
                phase: self.phase,
            });
        }

        let submission = Submission {
            exam_id: self.definition.id.clone(),
            answers: self.answers.clone(),
            reason: self.pending_reason.take().unwrap_or(SubmitReason::Manual),
            remaining_seconds: self.remaining_seconds,
            elapsed_seconds: self.elapsed_seconds(),
            submitted_at: Utc::now(),
        };
        self.phase = Phase::Completed;
        self.submission = Some(submission.clone());

        tracing::info!(
            exam_id = %submission.exam_id,
            answered = submission.answers.len(),
            reason = ?submission.reason,
            "exam submitted"
        );
        Ok(submission)
    }

    pub fn definition(&self) -> &Arc<ExamDefinition> {
        &self.definition
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.definition.question_at(self.current_index)
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.definition
            .total_time_budget_seconds
            .saturating_sub(self.remaining_seconds)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn answer_for(&self, question_id: &str) -> Option<usize> {
        self.answers.get(question_id).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Whether the question at a flat index has an answer.
    pub fn is_answered(&self, index: usize) -> bool {
        self.definition
            .question_at(index)
            .is_some_and(|q| self.answers.contains_key(&q.id))
    }

    /// Position through the exam as a rounded percentage.
    pub fn progress_percent(&self) -> u8 {
        percent(self.current_index + 1, self.definition.total_questions())
    }

    /// The sealed submission, once completed.
    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::three_section_exam;
    use crate::model::{ExamDefinition, Level};
    use crate::scoring::score;

    fn session() -> ExamSession {
        ExamSession::start(Arc::new(three_section_exam())).unwrap()
    }

    #[test]
    fn start_state() {
        let s = session();
        assert_eq!(s.phase(), Phase::InProgress);
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.remaining_seconds(), 5);
        assert!(s.answers().is_empty());
        assert_eq!(s.current_question().map(|q| q.id.as_str()), Some("q1"));
    }

    #[test]
    fn start_rejects_empty_exam() {
        let exam = ExamDefinition {
            id: "empty".into(),
            title: "Empty".into(),
            level: Level::N5,
            description: String::new(),
            total_time_budget_seconds: 60,
            passing_threshold: 60,
            sections: vec![],
        };
        assert_eq!(
            ExamSession::start(Arc::new(exam)).unwrap_err(),
            ValidationError::EmptyExam("empty".into())
        );
    }

    #[test]
    fn navigation_clamps() {
        let mut s = session();
        assert_eq!(s.go_to(2).unwrap(), 2);
        assert_eq!(s.go_to(99).unwrap(), 2);
        assert_eq!(s.next().unwrap(), 2);
        assert_eq!(s.previous().unwrap(), 1);
        assert_eq!(s.go_to(0).unwrap(), 0);
        assert_eq!(s.previous().unwrap(), 0);
        assert_eq!(s.remaining_seconds(), 5);
    }

    #[test]
    fn record_answer_overwrites_and_is_idempotent() {
        let mut s = session();
        s.record_answer("q1", 2).unwrap();
        s.record_answer("q1", 0).unwrap();
        s.record_answer("q1", 0).unwrap();
        assert_eq!(s.answer_for("q1"), Some(0));
        assert_eq!(s.answered_count(), 1);
        assert!(s.is_answered(0));
        assert!(!s.is_answered(1));
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let mut s = session();
        s.record_answer("q1", 1).unwrap();
        let err = s.record_answer("q1", 4).unwrap_err();
        assert_eq!(
            err,
            SessionError::Validation(ValidationError::OptionOutOfRange { index: 4, len: 4 })
        );
        assert_eq!(s.answer_for("q1"), Some(1));
        assert_eq!(s.answered_count(), 1);
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut s = session();
        assert!(matches!(
            s.record_answer("nope", 0),
            Err(SessionError::Validation(ValidationError::UnknownQuestion(_)))
        ));
        assert!(s.answers().is_empty());
    }

    #[test]
    fn answer_current_uses_position() {
        let mut s = session();
        s.go_to(1).unwrap();
        s.answer_current(3).unwrap();
        assert_eq!(s.answer_for("q2"), Some(3));
    }

    #[test]
    fn immediate_submit_scores_zero() {
        let mut s = session();
        let submission = s.submit().unwrap();
        assert_eq!(submission.reason, SubmitReason::Manual);
        assert_eq!(s.phase(), Phase::Completed);

        let report = score(s.definition(), &submission.answers);
        assert_eq!(report.answered_count, 0);
        assert_eq!(report.correct_count, 0);
        assert_eq!(report.score_percent, 0);
    }

    #[test]
    fn double_submit_produces_one_submission() {
        let mut s = session();
        let mut generated = 0;
        for _ in 0..2 {
            if s.submit().is_ok() {
                generated += 1;
            }
        }
        assert_eq!(generated, 1);
        assert!(s.submit().unwrap_err().is_invalid_transition());
        assert!(s.submission().is_some());
    }

    #[test]
    fn input_rejected_after_completion() {
        let mut s = session();
        s.record_answer("q1", 0).unwrap();
        s.submit().unwrap();

        let err = s.record_answer("q2", 1).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                operation: "record an answer",
                phase: Phase::Completed,
            }
        );
        assert!(s.go_to(1).unwrap_err().is_invalid_transition());
        assert_eq!(s.answered_count(), 1);
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn ticks_run_the_clock_out_exactly_once() {
        let mut s = session();
        s.record_answer("q1", 0).unwrap();

        let mut expirations = 0;
        for _ in 0..5 {
            if let TickOutcome::Expired(sub) = s.tick() {
                expirations += 1;
                assert_eq!(sub.reason, SubmitReason::TimeExpired);
                assert_eq!(sub.elapsed_seconds, 5);
            }
        }
        assert_eq!(expirations, 1);
        assert_eq!(s.phase(), Phase::Completed);
        assert_eq!(s.remaining_seconds(), 0);
        assert_eq!(s.tick(), TickOutcome::Idle);
        assert_eq!(s.remaining_seconds(), 0);
    }

    #[test]
    fn expired_and_manual_submissions_score_alike() {
        let mut manual = session();
        let mut timed = session();
        for s in [&mut manual, &mut timed] {
            s.record_answer("q1", 0).unwrap();
            s.record_answer("q2", 0).unwrap();
        }

        let by_hand = manual.submit().unwrap();
        let by_clock = loop {
            if let TickOutcome::Expired(sub) = timed.tick() {
                break sub;
            }
        };

        let a = score(manual.definition(), &by_hand.answers);
        let b = score(timed.definition(), &by_clock.answers);
        assert_eq!(a, b);
        assert_eq!(a.correct_count, 1);
    }

    #[test]
    fn submitting_phase_blocks_input_and_clock() {
        let mut s = session();
        s.begin_submit().unwrap();
        assert_eq!(s.phase(), Phase::Submitting);
        assert_eq!(s.tick(), TickOutcome::Idle);
        assert!(s.record_answer("q1", 0).is_err());
        assert!(s.submit().unwrap_err().is_invalid_transition());

        let sub = s.complete_submission().unwrap();
        assert_eq!(sub.remaining_seconds, 5);
        assert!(s.complete_submission().is_err());
    }

    #[test]
    fn progress_rounds() {
        let mut s = session();
        assert_eq!(s.progress_percent(), 33);
        s.go_to(1).unwrap();
        assert_eq!(s.progress_percent(), 67);
        s.go_to(2).unwrap();
        assert_eq!(s.progress_percent(), 100);
    }
}

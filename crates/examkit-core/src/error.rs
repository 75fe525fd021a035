//! Error types for exam sessions and the question bank editor.
//!
//! Validation failures and invalid state transitions are always reported to
//! the caller. An operation that returns an error has not mutated anything.

use thiserror::Error;

use crate::session::Phase;

/// Input rejected because it would break a question or exam invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The question prompt is empty or whitespace.
    #[error("question prompt is empty")]
    EmptyPrompt,

    /// Fewer than the minimum number of non-blank options.
    #[error("a question needs at least {min} options, found {found}")]
    TooFewOptions { found: usize, min: usize },

    /// More than the maximum number of options.
    #[error("a question allows at most {max} options, found {found}")]
    TooManyOptions { found: usize, max: usize },

    /// An option index outside the question's option list.
    #[error("option index {index} out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },

    /// An option with no text.
    #[error("option text is empty")]
    BlankOption,

    /// The option marked correct was blank and got filtered out.
    #[error("the option marked correct (index {0}) is blank")]
    BlankCorrectOption(usize),

    /// Points outside the accepted range.
    #[error("points must be between {min} and {max}, got {got}")]
    InvalidPoints { got: u32, min: u32, max: u32 },

    /// No question with this id.
    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    /// A question kind not listed for the section type.
    #[error("question kind '{kind}' is not valid for {section_type} sections")]
    UnknownQuestionKind { kind: String, section_type: String },

    /// An exam definition without any questions.
    #[error("exam '{0}' has no questions")]
    EmptyExam(String),
}

/// Errors returned by [`ExamSession`](crate::session::ExamSession) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation is not allowed in the current phase. Nothing changed.
    #[error("cannot {operation} while session is {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },
}

impl SessionError {
    /// Returns `true` for rejected transitions (as opposed to bad input).
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, SessionError::InvalidTransition { .. })
    }
}

/// Errors returned through a [`SessionHandle`](crate::driver::SessionHandle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The driver task has exited (abandoned or panicked).
    #[error("session driver is no longer running")]
    Stopped,
}

impl From<ValidationError> for DriverError {
    fn from(err: ValidationError) -> Self {
        DriverError::Session(err.into())
    }
}

impl DriverError {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, DriverError::Session(e) if e.is_invalid_transition())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = ValidationError::OptionOutOfRange { index: 7, len: 4 };
        assert_eq!(err.to_string(), "option index 7 out of range for 4 options");

        let err = SessionError::InvalidTransition {
            operation: "record an answer",
            phase: Phase::Completed,
        };
        assert_eq!(
            err.to_string(),
            "cannot record an answer while session is completed"
        );
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn validation_converts_into_session_error() {
        let err: SessionError = ValidationError::UnknownQuestion("q9".into()).into();
        assert!(!err.is_invalid_transition());
        assert_eq!(err.to_string(), "unknown question: q9");
    }

    #[test]
    fn driver_error_wraps_session_error() {
        let err: DriverError = SessionError::InvalidTransition {
            operation: "submit",
            phase: Phase::Completed,
        }
        .into();
        assert!(err.is_invalid_transition());
        assert_eq!(err.to_string(), "cannot submit while session is completed");
        assert!(!DriverError::Stopped.is_invalid_transition());
    }
}

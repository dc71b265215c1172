use thiserror::Error;

use crate::exam::session::Phase;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SessionError {
    #[error("{operation} is not allowed while the session is {phase}")]
    InvalidPhase { operation: &'static str, phase: Phase },
    #[error("an exam paper request is already in flight")]
    RequestInFlight,
    #[error("invalid exam request: {0}")]
    InvalidRequest(String),
    #[error("exam paper generation failed: {0}")]
    GenerationFailed(String),
    #[error("exam paper generation timed out after {0} seconds")]
    GenerationTimedOut(u64),
    #[error("exam paper response no longer matches the pending request")]
    StaleResponse,
    #[error("question {0} is not part of this paper")]
    UnknownQuestion(i64),
    #[error("option {option_index} is out of range for question {question_id} ({option_count} options)")]
    OptionOutOfRange { question_id: i64, option_index: usize, option_count: usize },
    #[error("exam paper has no questions")]
    EmptyPaper,
}

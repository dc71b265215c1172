use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::exam::errors::SessionError;

pub(crate) const GENERATION_RETRY_DETAIL: &str = "Failed to generate exam paper. Try again.";

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    Conflict(String),
    ServiceUnavailable(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidPhase { .. }
            | SessionError::RequestInFlight
            | SessionError::StaleResponse => ApiError::Conflict(err.to_string()),
            SessionError::InvalidRequest(_)
            | SessionError::UnknownQuestion(_)
            | SessionError::OptionOutOfRange { .. } => ApiError::BadRequest(err.to_string()),
            SessionError::GenerationFailed(_)
            | SessionError::GenerationTimedOut(_)
            | SessionError::EmptyPaper => {
                tracing::warn!(error = %err, "Exam paper unavailable");
                ApiError::ServiceUnavailable(GENERATION_RETRY_DETAIL.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::BadRequest(message)
            | ApiError::Conflict(message)
            | ApiError::ServiceUnavailable(message) => message,
        };
        (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::session::Phase;

    #[test]
    fn session_errors_map_to_http_statuses() {
        let cases = [
            (SessionError::InvalidPhase { operation: "start", phase: Phase::Setup }, 409),
            (SessionError::RequestInFlight, 409),
            (SessionError::UnknownQuestion(99), 400),
            (
                SessionError::OptionOutOfRange { question_id: 1, option_index: 9, option_count: 4 },
                400,
            ),
            (SessionError::GenerationTimedOut(120), 503),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), expected);
        }
    }

    #[test]
    fn generation_failures_carry_retry_prompt() {
        let ApiError::ServiceUnavailable(detail) =
            ApiError::from(SessionError::GenerationFailed("upstream 500".to_string()))
        else {
            panic!("expected service unavailable");
        };
        assert_eq!(detail, GENERATION_RETRY_DETAIL);
    }
}

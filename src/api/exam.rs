use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::exam::catalog::{available_exams, DEFAULT_DIFFICULTY, DIFFICULTY_LEVELS};
use crate::schemas::exam::{
    AnswerPayload, CatalogQuery, CatalogResponse, ExamRequestPayload, NavigatePayload,
    NavigateResponse, SessionSnapshot, SubmitResponse, TickResponse, VisibilityPayload,
    VisibilityResponse,
};


pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(catalog))
        .route("/session", get(session))
        .route("/session/request", post(request_exam))
        .route("/session/cancel", post(cancel))
        .route("/session/start", post(start))
        .route("/session/answers/:question_id", put(record_answer).delete(clear_answer))
        .route("/session/navigate", post(navigate))
        .route("/session/submit", post(submit))
        .route("/session/tick", post(tick))
        .route("/session/visibility", post(visibility))
        .route("/session/reset", post(reset))
}

async fn catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Json<CatalogResponse> {
    let education_level =
        query.education_level.map(|level| level.trim().to_string()).filter(|level| !level.is_empty());

    Json(CatalogResponse {
        exams: available_exams(education_level.as_deref()).to_vec(),
        education_level,
        difficulty_levels: DIFFICULTY_LEVELS.to_vec(),
        default_difficulty: DEFAULT_DIFFICULTY,
        default_question_count: state.settings().exam().default_question_count,
    })
}

async fn session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.sessions().snapshot().await)
}

async fn request_exam(
    State(state): State<AppState>,
    Json(payload): Json<ExamRequestPayload>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let difficulty = payload.difficulty.as_deref().unwrap_or(DEFAULT_DIFFICULTY);
    let question_count =
        payload.question_count.unwrap_or(state.settings().exam().default_question_count);

    state.sessions().request_exam(&payload.exam_type, difficulty, question_count).await?;
    Ok(Json(state.sessions().snapshot().await))
}

async fn cancel(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, ApiError> {
    state.sessions().cancel().await?;
    Ok(Json(state.sessions().snapshot().await))
}

async fn start(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, ApiError> {
    state.sessions().start().await?;
    Ok(Json(state.sessions().snapshot().await))
}

async fn record_answer(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
    Json(payload): Json<AnswerPayload>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state.sessions().record_answer(question_id, payload.option_index).await?;
    Ok(Json(state.sessions().snapshot().await))
}

async fn clear_answer(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state.sessions().clear_answer(question_id).await?;
    Ok(Json(state.sessions().snapshot().await))
}

async fn navigate(
    State(state): State<AppState>,
    Json(payload): Json<NavigatePayload>,
) -> Result<Json<NavigateResponse>, ApiError> {
    let navigation =
        state.sessions().navigate(payload.section_index, payload.question_index).await?;
    Ok(Json(NavigateResponse { navigation, session: state.sessions().snapshot().await }))
}

async fn submit(State(state): State<AppState>) -> Result<Json<SubmitResponse>, ApiError> {
    let outcome = state.sessions().submit().await?;
    Ok(Json(SubmitResponse {
        outcome: outcome.label(),
        result: outcome.result().clone(),
        session: state.sessions().snapshot().await,
    }))
}

async fn tick(State(state): State<AppState>) -> Json<TickResponse> {
    let outcome = state.sessions().tick().await;
    Json(TickResponse {
        outcome: outcome.as_ref().map(|outcome| outcome.label()),
        session: state.sessions().snapshot().await,
    })
}

async fn visibility(
    State(state): State<AppState>,
    Json(payload): Json<VisibilityPayload>,
) -> Json<VisibilityResponse> {
    let report = state.sessions().report_visibility(payload.hidden).await;
    Json(VisibilityResponse {
        verdict: report.verdict,
        result: report.outcome.map(|outcome| outcome.result().clone()),
        session: state.sessions().snapshot().await,
    })
}

async fn reset(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, ApiError> {
    state.sessions().reset().await?;
    Ok(Json(state.sessions().snapshot().await))
}

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::history::analytics;
use crate::schemas::history::{HistoryResponse, SummaryQuery, SummaryResponse, DEFAULT_RECENT_RESULTS};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_history)).route("/summary", get(summary))
}

async fn list_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        backend: state.history().backend(),
        results: state.history().read_all().await,
    })
}

async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    query.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let history = state.history().read_all().await;
    Ok(Json(SummaryResponse {
        summary: analytics::summarize(&history),
        recent: analytics::recent(&history, query.recent.unwrap_or(DEFAULT_RECENT_RESULTS)),
    }))
}

pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod exam;
pub(crate) mod history;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::config::{HistoryBackend, Settings};
use crate::core::{redis::RedisHandle, state::AppState, telemetry};
use crate::history::HistoryStore;
use crate::services::exam_generation::AiExamGenerator;
use crate::services::exam_session::{ExamSessionController, SessionLimits};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; continuing without it");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let history = HistoryStore::from_settings(&settings, &redis);
    if settings.history().backend == HistoryBackend::Redis && !redis.is_connected().await {
        tracing::warn!("History backend is Redis but Redis is unavailable; results will not be saved");
    }
    let generator = AiExamGenerator::from_settings(&settings)?;
    let sessions = ExamSessionController::new(
        Arc::new(generator),
        history,
        SessionLimits::from_settings(&settings),
    );

    let state = AppState::new(settings, redis.clone(), sessions.clone());
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Exam proctor API listening"
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(core::shutdown::shutdown_signal(sessions))
        .await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

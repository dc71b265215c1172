use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::history::HistoryStore;
use crate::services::exam_session::ExamSessionController;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    redis: RedisHandle,
    sessions: ExamSessionController,
}

impl AppState {
    pub(crate) fn new(settings: Settings, redis: RedisHandle, sessions: ExamSessionController) -> Self {
        Self { inner: Arc::new(InnerState { settings, redis, sessions }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn sessions(&self) -> &ExamSessionController {
        &self.inner.sessions
    }

    pub(crate) fn history(&self) -> &HistoryStore {
        self.inner.sessions.history()
    }
}

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Duration;

use crate::api;
use crate::core::{config::Settings, redis::RedisHandle, state::AppState};
use crate::exam::paper::{ExamPaper, Question, DEFAULT_SECTION};
use crate::exam::result::TestResult;
use crate::history::blob::{BlobStore, MemoryBlobStore};
use crate::history::HistoryStore;
use crate::services::exam_generation::ExamContentGenerator;
use crate::services::exam_session::{ExamSessionController, SessionLimits};

const TEST_REDIS_DB: &str = "1";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) generator: Arc<FakeGenerator>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("PROCTOR_ENV", "test");
    std::env::set_var("PROCTOR_STRICT_CONFIG", "0");
    std::env::set_var("HISTORY_BACKEND", "memory");
    std::env::set_var("REDIS_HOST", "127.0.0.1");
    std::env::set_var("REDIS_PORT", "6379");
    std::env::set_var("REDIS_DB", TEST_REDIS_DB);
    std::env::remove_var("REDIS_PASSWORD");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("API_V1_STR");
    std::env::remove_var("PROJECT_NAME");
    std::env::remove_var("EXAM_DEFAULT_QUESTION_COUNT");
    std::env::remove_var("EXAM_GENERATION_TIMEOUT_SECONDS");
    std::env::remove_var("EXAM_TICK_INTERVAL_MS");
}

pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let generator = Arc::new(FakeGenerator::new());
    let state = build_state_with(settings, generator.clone());
    let app = api::router::router(state.clone());

    TestContext { state, app, generator, _guard: guard }
}

/// State over an in-memory history and a fresh fake generator. Redis stays
/// disconnected.
pub(crate) fn build_state(settings: Settings) -> AppState {
    build_state_with(settings, Arc::new(FakeGenerator::new()))
}

fn build_state_with(settings: Settings, generator: Arc<FakeGenerator>) -> AppState {
    let redis = RedisHandle::new(settings.redis().redis_url());
    let sessions = ExamSessionController::new(
        generator,
        memory_history(),
        SessionLimits::from_settings(&settings),
    );
    AppState::new(settings, redis, sessions)
}

pub(crate) fn memory_history() -> HistoryStore {
    HistoryStore::new(Arc::new(MemoryBlobStore::new()))
}

pub(crate) fn test_limits() -> SessionLimits {
    SessionLimits {
        generation_timeout: Duration::from_secs(30),
        tick_interval: Duration::from_secs(1),
        max_question_count: 200,
    }
}

/// Paper whose questions are numbered from 1, carry four options and are all
/// keyed to option 0.
pub(crate) fn paper_with_sections(sections: &[(&str, usize)]) -> ExamPaper {
    let mut questions = Vec::new();
    for (section, count) in sections {
        for _ in 0..*count {
            let id = questions.len() as i64 + 1;
            questions.push(Question {
                id,
                section: section.to_string(),
                question_text: format!("{section} question {id}"),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_option_index: 0,
                explanation: format!("Option A answers question {id}"),
            });
        }
    }

    ExamPaper {
        title: "Mock Test".to_string(),
        duration_minutes_hint: 0,
        sections: sections.iter().map(|(section, _)| section.to_string()).collect(),
        questions,
    }
}

pub(crate) fn single_section_paper(question_count: usize) -> ExamPaper {
    paper_with_sections(&[(DEFAULT_SECTION, question_count)])
}

pub(crate) fn sample_result(id: &str, accuracy: u32) -> TestResult {
    TestResult {
        id: id.to_string(),
        exam_title: "JEE Mains Mock".to_string(),
        date: 1_735_813_230_000,
        score: 12,
        total_score: 40,
        accuracy,
        correct_count: 4,
        incorrect_count: 4,
        unattempted_count: 2,
        weakest_section: "Chemistry".to_string(),
        strongest_section: "Physics".to_string(),
    }
}

/// Generator driven by a queue of scripted replies. An empty queue serves a
/// single-section paper of the requested size.
#[derive(Default)]
pub(crate) struct FakeGenerator {
    replies: std::sync::Mutex<VecDeque<Result<ExamPaper, String>>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl FakeGenerator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn push_paper(&self, paper: ExamPaper) {
        self.replies.lock().expect("replies").push_back(Ok(paper));
    }

    pub(crate) fn push_failure(&self, message: &str) {
        self.replies.lock().expect("replies").push_back(Err(message.to_string()));
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl ExamContentGenerator for FakeGenerator {
    async fn generate_exam_paper(
        &self,
        exam_type: &str,
        _difficulty: &str,
        question_count: u32,
    ) -> Result<ExamPaper> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self.replies.lock().expect("replies").pop_front();
        match reply {
            Some(Ok(paper)) => Ok(paper),
            Some(Err(message)) => Err(anyhow!(message)),
            None => {
                let mut paper = single_section_paper(question_count as usize);
                paper.title = format!("{exam_type} Mock Test");
                Ok(paper)
            }
        }
    }
}

/// In-memory blob store whose reads and writes can be made to fail.
#[derive(Default)]
pub(crate) struct FlakyBlobStore {
    inner: MemoryBlobStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyBlobStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    fn backend(&self) -> &'static str {
        "flaky"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("read failure injected"));
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("write failure injected"));
        }
        self.inner.write(key, value).await
    }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

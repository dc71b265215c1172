use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Duration;

use crate::core::config::Settings;
use crate::core::time::format_millis;
use crate::exam::errors::SessionError;
use crate::exam::integrity::IntegrityVerdict;
use crate::exam::session::{
    IntegrityReport, Navigation, Phase, SessionOutcome, SessionState, StartedSession,
};
use crate::history::HistoryStore;
use crate::schemas::exam::SessionSnapshot;
use crate::services::exam_generation::ExamContentGenerator;
use crate::tasks::session_clock::SessionTicker;

#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionLimits {
    pub(crate) generation_timeout: Duration,
    pub(crate) tick_interval: Duration,
    pub(crate) max_question_count: u32,
}

impl SessionLimits {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            generation_timeout: Duration::from_secs(settings.exam().generation_timeout_seconds),
            tick_interval: Duration::from_millis(settings.exam().tick_interval_ms),
            max_question_count: settings.max_question_count(),
        }
    }
}

/// Drives the single exam session: generation requests, the ticker of the
/// active phase and persistence of finished sessions.
///
/// Every transition runs under one lock. The lock is released while the
/// generator works and held while a finished session is written to history.
#[derive(Clone)]
pub(crate) struct ExamSessionController {
    inner: Arc<Inner>,
}

struct Inner {
    session: Mutex<Session>,
    generator: Arc<dyn ExamContentGenerator>,
    history: HistoryStore,
    limits: SessionLimits,
}

#[derive(Default)]
struct Session {
    state: SessionState,
    ticker: Option<SessionTicker>,
}

impl Session {
    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}

impl ExamSessionController {
    pub(crate) fn new(
        generator: Arc<dyn ExamContentGenerator>,
        history: HistoryStore,
        limits: SessionLimits,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::default()),
                generator,
                history,
                limits,
            }),
        }
    }

    pub(crate) fn history(&self) -> &HistoryStore {
        &self.inner.history
    }

    pub(crate) async fn request_exam(
        &self,
        exam_type: &str,
        difficulty: &str,
        question_count: u32,
    ) -> Result<(), SessionError> {
        let exam_type = exam_type.trim();
        let difficulty = difficulty.trim();
        if exam_type.is_empty() {
            return Err(SessionError::InvalidRequest("exam type must not be empty".to_string()));
        }
        if difficulty.is_empty() {
            return Err(SessionError::InvalidRequest("difficulty must not be empty".to_string()));
        }
        let max = self.inner.limits.max_question_count;
        if question_count == 0 || question_count > max {
            return Err(SessionError::InvalidRequest(format!(
                "question count must be between 1 and {max}"
            )));
        }

        let ticket = self.lock().await.state.begin_request()?;
        tracing::info!(exam_type, difficulty, question_count, "Exam paper requested");

        let timer = Instant::now();
        let timeout = self.inner.limits.generation_timeout;
        let generated = tokio::time::timeout(
            timeout,
            self.inner.generator.generate_exam_paper(exam_type, difficulty, question_count),
        )
        .await;
        metrics::histogram!("exam_generation_duration_seconds").record(timer.elapsed().as_secs_f64());

        let mut session = self.lock().await;
        let paper = match generated {
            Ok(Ok(paper)) => paper,
            Ok(Err(err)) => {
                if !session.state.fail_request(ticket) {
                    record_generation("stale");
                    return Err(SessionError::StaleResponse);
                }
                record_generation("failed");
                tracing::warn!(error = %err, exam_type, "Exam paper generation failed");
                return Err(SessionError::GenerationFailed(err.to_string()));
            }
            Err(_) => {
                if !session.state.fail_request(ticket) {
                    record_generation("stale");
                    return Err(SessionError::StaleResponse);
                }
                record_generation("timeout");
                tracing::warn!(
                    exam_type,
                    timeout_seconds = timeout.as_secs(),
                    "Exam paper generation timed out"
                );
                return Err(SessionError::GenerationTimedOut(timeout.as_secs()));
            }
        };

        let questions = paper.question_count();
        match session.state.accept_paper(ticket, paper) {
            Ok(()) => {
                record_generation("success");
                tracing::info!(exam_type, questions, "Exam paper ready");
                Ok(())
            }
            Err(SessionError::EmptyPaper) => {
                record_generation("failed");
                tracing::warn!(exam_type, "Generated exam paper had no questions");
                Err(SessionError::GenerationFailed("exam paper has no questions".to_string()))
            }
            Err(err) => {
                record_generation("stale");
                tracing::info!(exam_type, "Discarding exam paper for an abandoned request");
                Err(err)
            }
        }
    }

    pub(crate) async fn cancel(&self) -> Result<(), SessionError> {
        let mut session = self.lock().await;
        session.state.cancel()?;
        tracing::info!(phase = %session.state.phase(), "Exam request cancelled");
        Ok(())
    }

    pub(crate) async fn start(&self) -> Result<StartedSession, SessionError> {
        let mut session = self.lock().await;
        let started = session.state.start()?;

        session.stop_ticker();
        session.ticker = Some(SessionTicker::spawn(
            self.clone(),
            started.epoch,
            self.inner.limits.tick_interval,
        ));

        metrics::counter!("exam_sessions_started_total").increment(1);
        tracing::info!(
            epoch = started.epoch,
            seconds_remaining = started.seconds_remaining,
            "Exam session started"
        );
        Ok(started)
    }

    pub(crate) async fn record_answer(
        &self,
        question_id: i64,
        option_index: usize,
    ) -> Result<(), SessionError> {
        self.lock().await.state.record_answer(question_id, option_index)
    }

    pub(crate) async fn clear_answer(&self, question_id: i64) -> Result<(), SessionError> {
        self.lock().await.state.clear_answer(question_id)
    }

    pub(crate) async fn navigate(
        &self,
        section_index: usize,
        question_index: usize,
    ) -> Result<Navigation, SessionError> {
        self.lock().await.state.navigate(section_index, question_index)
    }

    pub(crate) async fn submit(&self) -> Result<SessionOutcome, SessionError> {
        let mut session = self.lock().await;
        let outcome = session.state.submit()?;
        self.conclude(&mut session, &outcome).await;
        Ok(outcome)
    }

    /// Manual clock tick for the current session.
    pub(crate) async fn tick(&self) -> Option<SessionOutcome> {
        let mut session = self.lock().await;
        let outcome = session.state.tick()?;
        self.conclude(&mut session, &outcome).await;
        Some(outcome)
    }

    /// Tick from the ticker spawned for `epoch`. Returns whether that ticker
    /// should keep running.
    pub(crate) async fn tick_epoch(&self, epoch: u64) -> bool {
        let mut session = self.lock().await;
        if !session.state.is_ticking(epoch) {
            return false;
        }
        match session.state.tick_for(epoch) {
            Some(outcome) => {
                tracing::info!(epoch, "Exam time expired; submitting");
                self.conclude(&mut session, &outcome).await;
                false
            }
            None => session.state.is_ticking(epoch),
        }
    }

    pub(crate) async fn report_visibility(&self, hidden: bool) -> IntegrityReport {
        if !hidden {
            return IntegrityReport { verdict: IntegrityVerdict::Ignored, outcome: None };
        }

        let mut session = self.lock().await;
        let report = session.state.record_visibility_loss();
        match &report.verdict {
            IntegrityVerdict::Ignored => {}
            IntegrityVerdict::Warning { violation, .. } => {
                metrics::counter!("exam_integrity_violations_total").increment(1);
                tracing::warn!(violation, "Tab switch detected during exam");
            }
            IntegrityVerdict::Disqualified { violations } => {
                metrics::counter!("exam_integrity_violations_total").increment(1);
                tracing::warn!(violations, "Exam terminated for malpractice");
            }
        }
        if let Some(outcome) = &report.outcome {
            self.conclude(&mut session, outcome).await;
        }
        report
    }

    pub(crate) async fn reset(&self) -> Result<(), SessionError> {
        let mut session = self.lock().await;
        session.state.reset()?;
        session.stop_ticker();
        tracing::info!("Exam session reset");
        Ok(())
    }

    pub(crate) async fn phase(&self) -> Phase {
        self.lock().await.state.phase()
    }

    pub(crate) async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(&self.lock().await.state)
    }

    pub(crate) async fn shutdown(&self) {
        let mut session = self.lock().await;
        if let Some(ticker) = session.ticker.take() {
            tracing::info!(epoch = ticker.epoch(), "Stopping session ticker for shutdown");
            ticker.stop();
        }
    }

    #[cfg(test)]
    pub(crate) async fn ticker_running(&self) -> bool {
        self.lock().await.ticker.as_ref().is_some_and(|ticker| !ticker.is_finished())
    }

    async fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.session.lock().await
    }

    async fn conclude(&self, session: &mut Session, outcome: &SessionOutcome) {
        session.stop_ticker();

        let result = outcome.result();
        self.inner.history.append(result).await;

        metrics::counter!("exam_sessions_finished_total", "outcome" => outcome.label()).increment(1);
        tracing::info!(
            outcome = outcome.label(),
            result_id = %result.id,
            score = result.score,
            total_score = result.total_score,
            accuracy = result.accuracy,
            finished_at = %format_millis(result.date),
            "Exam session finished"
        );
    }
}

fn record_generation(status: &'static str) {
    metrics::counter!("exam_generation_requests_total", "status" => status).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::result::DISQUALIFIED_SECTION;
    use crate::test_support::{memory_history, single_section_paper, test_limits, FakeGenerator};

    fn controller(generator: FakeGenerator) -> ExamSessionController {
        ExamSessionController::new(Arc::new(generator), memory_history(), test_limits())
    }

    async fn active_controller(question_count: usize) -> ExamSessionController {
        let generator = FakeGenerator::new();
        generator.push_paper(single_section_paper(question_count));
        let controller = controller(generator);
        controller.request_exam("JEE Mains", "Standard", 30).await.expect("request");
        controller.start().await.expect("start");
        controller
    }

    #[tokio::test(start_paused = true)]
    async fn request_moves_to_instructions() {
        let controller = controller(FakeGenerator::new());
        controller.request_exam("NEET UG", "Hard", 5).await.expect("request");

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Instructions);
        assert!(!snapshot.request_in_flight);
        assert_eq!(snapshot.exam.as_ref().map(|exam| exam.questions.len()), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_requests_are_rejected_before_generation() {
        let generator = FakeGenerator::new();
        let calls = generator.calls();
        let controller = controller(generator);

        let err = controller.request_exam("  ", "Standard", 30).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidRequest(_)));
        let err = controller.request_exam("GATE", "Standard", 0).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidRequest(_)));
        let err = controller.request_exam("GATE", "Standard", 201).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidRequest(_)));

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(controller.snapshot().await.phase, Phase::Setup);
    }

    #[tokio::test(start_paused = true)]
    async fn generation_failure_keeps_setup_and_allows_retry() {
        let generator = FakeGenerator::new();
        generator.push_failure("model overloaded");
        let controller = controller(generator);

        let err = controller.request_exam("UPSC CSE", "Standard", 10).await.unwrap_err();
        assert!(matches!(err, SessionError::GenerationFailed(_)));
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Setup);
        assert!(snapshot.exam.is_none());
        assert!(!snapshot.request_in_flight);

        controller.request_exam("UPSC CSE", "Standard", 10).await.expect("retry");
        assert_eq!(controller.snapshot().await.phase, Phase::Instructions);
    }

    #[tokio::test(start_paused = true)]
    async fn generation_timeout_clears_pending_request() {
        let generator = FakeGenerator::new().with_delay(Duration::from_secs(600));
        let controller = controller(generator);

        let err = controller.request_exam("GATE", "Standard", 10).await.unwrap_err();
        assert_eq!(err, SessionError::GenerationTimedOut(test_limits().generation_timeout.as_secs()));
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Setup);
        assert!(!snapshot.request_in_flight);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_request_is_rejected_while_first_completes() {
        let generator = FakeGenerator::new().with_delay(Duration::from_secs(5));
        let controller = controller(generator);

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.request_exam("CLAT", "Standard", 4).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(controller.snapshot().await.request_in_flight);

        let err = controller.request_exam("CLAT", "Standard", 4).await.unwrap_err();
        assert_eq!(err, SessionError::RequestInFlight);

        first.await.expect("join").expect("first request");
        assert_eq!(controller.snapshot().await.phase, Phase::Instructions);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_request_drops_late_paper() {
        let generator = FakeGenerator::new().with_delay(Duration::from_secs(5));
        let controller = controller(generator);

        let pending = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.request_exam("JEE Mains", "Standard", 3).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.cancel().await.expect("cancel");

        let err = pending.await.expect("join").unwrap_err();
        assert_eq!(err, SessionError::StaleResponse);
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Setup);
        assert!(snapshot.exam.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clock_expiry_submits_exactly_once() {
        let controller = active_controller(2).await;
        assert_eq!(controller.snapshot().await.seconds_remaining, 120);

        tokio::time::sleep(Duration::from_millis(60_500)).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Active);
        assert_eq!(snapshot.seconds_remaining, 60);

        tokio::time::sleep(Duration::from_secs(120)).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Result);
        assert_eq!(snapshot.seconds_remaining, 0);
        assert!(!controller.ticker_running().await);
        assert_eq!(controller.history().read_all().await.len(), 1);

        assert!(controller.tick().await.is_none());
        assert_eq!(controller.history().read_all().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_scores_persists_and_stops_ticker() {
        let controller = active_controller(3).await;
        controller.record_answer(1, 0).await.expect("answer");
        controller.record_answer(2, 3).await.expect("answer");

        let outcome = controller.submit().await.expect("submit");
        let SessionOutcome::Completed { result, scorecard } = outcome else {
            panic!("expected completed outcome");
        };
        assert_eq!(result.score, 3);
        assert_eq!(result.total_score, 12);
        assert_eq!(scorecard.accuracy, 50);

        let clock_before = controller.snapshot().await.seconds_remaining;
        tokio::time::sleep(Duration::from_secs(10)).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.seconds_remaining, clock_before);
        assert!(!snapshot.clock_running);
        assert!(!snapshot.monitor_armed);

        let history = controller.history().read_all().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, result.id);
    }

    #[tokio::test(start_paused = true)]
    async fn third_visibility_loss_disqualifies_once() {
        let controller = active_controller(3).await;

        assert_eq!(controller.report_visibility(false).await.verdict, IntegrityVerdict::Ignored);
        for expected in 1..=2 {
            let report = controller.report_visibility(true).await;
            assert!(matches!(
                report.verdict,
                IntegrityVerdict::Warning { violation, .. } if violation == expected
            ));
        }

        let report = controller.report_visibility(true).await;
        assert_eq!(report.verdict, IntegrityVerdict::Disqualified { violations: 3 });
        let result = report.outcome.expect("outcome").result().clone();
        assert_eq!(result.weakest_section, DISQUALIFIED_SECTION);
        assert_eq!(result.score, 0);

        let late = controller.report_visibility(true).await;
        assert_eq!(late.verdict, IntegrityVerdict::Ignored);
        tokio::time::sleep(Duration::from_secs(400)).await;

        assert_eq!(controller.snapshot().await.phase, Phase::Terminated);
        assert_eq!(controller.history().read_all().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_ticker_does_not_touch_next_session() {
        let generator = FakeGenerator::new();
        generator.push_paper(single_section_paper(1));
        generator.push_paper(single_section_paper(5));
        let controller = controller(generator);

        controller.request_exam("GATE", "Standard", 1).await.expect("request");
        let first = controller.start().await.expect("start");
        controller.submit().await.expect("submit");
        controller.reset().await.expect("reset");

        controller.request_exam("GATE", "Standard", 5).await.expect("request");
        let second = controller.start().await.expect("start");
        assert!(second.epoch > first.epoch);

        assert!(!controller.tick_epoch(first.epoch).await);
        assert_eq!(controller.snapshot().await.seconds_remaining, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_is_refused_while_active() {
        let controller = active_controller(2).await;
        let err = controller.reset().await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { phase: Phase::Active, .. }));
        assert!(controller.ticker_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_active_ticker() {
        let controller = active_controller(2).await;
        controller.shutdown().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Active);
        assert_eq!(snapshot.seconds_remaining, 120);
    }
}

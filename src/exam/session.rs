use std::fmt;

use serde::Serialize;

use crate::exam::clock::{ClockTick, SessionClock};
use crate::exam::errors::SessionError;
use crate::exam::integrity::{IntegrityMonitor, IntegrityVerdict};
use crate::exam::paper::{ExamPaper, Question};
use crate::exam::result::TestResult;
use crate::exam::scoring::{self, AnswerMap, Scorecard};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum Phase {
    #[default]
    Setup,
    Instructions,
    Active,
    Terminated,
    Result,
}

impl Phase {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Phase::Setup => "SETUP",
            Phase::Instructions => "INSTRUCTIONS",
            Phase::Active => "ACTIVE",
            Phase::Terminated => "TERMINATED",
            Phase::Result => "RESULT",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StartedSession {
    pub(crate) epoch: u64,
    pub(crate) seconds_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionOutcome {
    Completed { result: TestResult, scorecard: Scorecard },
    Disqualified { result: TestResult },
}

impl SessionOutcome {
    pub(crate) fn result(&self) -> &TestResult {
        match self {
            SessionOutcome::Completed { result, .. } | SessionOutcome::Disqualified { result } => {
                result
            }
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            SessionOutcome::Completed { .. } => "completed",
            SessionOutcome::Disqualified { .. } => "disqualified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum Navigation {
    #[serde(rename_all = "camelCase")]
    Question { section_index: usize, question_index: usize, question_id: i64 },
    #[serde(rename_all = "camelCase")]
    NoQuestions { section_index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IntegrityReport {
    pub(crate) verdict: IntegrityVerdict,
    pub(crate) outcome: Option<SessionOutcome>,
}

/// State of the single exam session. Every mutation goes through a transition
/// method that checks the current phase first, so repeated or late triggers
/// (a second zero tick, a fourth visibility loss) are no-ops or errors rather
/// than a second transition.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    phase: Phase,
    paper: Option<ExamPaper>,
    answers: AnswerMap,
    section_index: usize,
    question_index: usize,
    clock: SessionClock,
    monitor: IntegrityMonitor,
    pending_request: Option<u64>,
    next_ticket: u64,
    epoch: u64,
    last_result: Option<TestResult>,
    last_scorecard: Option<Scorecard>,
}

impl SessionState {
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn paper(&self) -> Option<&ExamPaper> {
        self.paper.as_ref()
    }

    pub(crate) fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub(crate) fn current_section_index(&self) -> usize {
        self.section_index
    }

    pub(crate) fn current_question_index(&self) -> usize {
        self.question_index
    }

    pub(crate) fn current_question(&self) -> Option<&Question> {
        let paper = self.paper.as_ref()?;
        paper.section_questions(self.section_index).get(self.question_index).copied()
    }

    pub(crate) fn seconds_remaining(&self) -> u32 {
        self.clock.remaining()
    }

    pub(crate) fn violation_count(&self) -> u32 {
        self.monitor.violations()
    }

    pub(crate) fn remaining_attempts(&self) -> u32 {
        self.monitor.remaining_attempts()
    }

    pub(crate) fn request_in_flight(&self) -> bool {
        self.pending_request.is_some()
    }

    pub(crate) fn clock_running(&self) -> bool {
        self.clock.is_running()
    }

    pub(crate) fn monitor_armed(&self) -> bool {
        self.monitor.is_armed()
    }

    pub(crate) fn last_result(&self) -> Option<&TestResult> {
        self.last_result.as_ref()
    }

    pub(crate) fn last_scorecard(&self) -> Option<&Scorecard> {
        self.last_scorecard.as_ref()
    }

    /// True while the ticker spawned for `epoch` should keep running.
    pub(crate) fn is_ticking(&self, epoch: u64) -> bool {
        self.phase() == Phase::Active && self.epoch == epoch && self.clock.is_running()
    }

    fn require(&self, operation: &'static str, expected: Phase) -> Result<(), SessionError> {
        if self.phase() == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase { operation, phase: self.phase() })
        }
    }

    pub(crate) fn begin_request(&mut self) -> Result<RequestTicket, SessionError> {
        self.require("request_exam", Phase::Setup)?;
        if self.pending_request.is_some() {
            return Err(SessionError::RequestInFlight);
        }

        self.next_ticket += 1;
        self.pending_request = Some(self.next_ticket);
        Ok(RequestTicket(self.next_ticket))
    }

    /// Clears the pending request if `ticket` is still the one in flight.
    pub(crate) fn fail_request(&mut self, ticket: RequestTicket) -> bool {
        if self.pending_request == Some(ticket.0) {
            self.pending_request = None;
            return true;
        }
        false
    }

    pub(crate) fn accept_paper(
        &mut self,
        ticket: RequestTicket,
        paper: ExamPaper,
    ) -> Result<(), SessionError> {
        if self.phase() != Phase::Setup || self.pending_request != Some(ticket.0) {
            return Err(SessionError::StaleResponse);
        }
        self.pending_request = None;

        if paper.questions.is_empty() {
            return Err(SessionError::EmptyPaper);
        }

        self.paper = Some(paper);
        self.answers.clear();
        self.section_index = 0;
        self.question_index = 0;
        self.clock.reset();
        self.monitor.reset();
        self.phase = Phase::Instructions;
        Ok(())
    }

    pub(crate) fn cancel(&mut self) -> Result<(), SessionError> {
        match self.phase() {
            Phase::Setup if self.pending_request.is_some() => {
                self.pending_request = None;
                Ok(())
            }
            Phase::Instructions => {
                self.return_to_setup();
                Ok(())
            }
            phase => Err(SessionError::InvalidPhase { operation: "cancel", phase }),
        }
    }

    pub(crate) fn start(&mut self) -> Result<StartedSession, SessionError> {
        self.require("start", Phase::Instructions)?;
        let question_count = match self.paper.as_ref() {
            Some(paper) if !paper.questions.is_empty() => paper.question_count(),
            _ => return Err(SessionError::EmptyPaper),
        };

        self.epoch += 1;
        self.answers.clear();
        self.section_index = 0;
        self.question_index = 0;
        self.clock.start(SessionClock::budget_for(question_count));
        self.monitor.arm();
        self.phase = Phase::Active;

        Ok(StartedSession { epoch: self.epoch, seconds_remaining: self.clock.remaining() })
    }

    pub(crate) fn record_answer(
        &mut self,
        question_id: i64,
        option_index: usize,
    ) -> Result<(), SessionError> {
        self.require("record_answer", Phase::Active)?;
        let question = self
            .paper
            .as_ref()
            .and_then(|paper| paper.question(question_id))
            .ok_or(SessionError::UnknownQuestion(question_id))?;

        if option_index >= question.options.len() {
            return Err(SessionError::OptionOutOfRange {
                question_id,
                option_index,
                option_count: question.options.len(),
            });
        }

        self.answers.insert(question_id, option_index);
        Ok(())
    }

    pub(crate) fn clear_answer(&mut self, question_id: i64) -> Result<(), SessionError> {
        self.require("clear_answer", Phase::Active)?;
        self.answers.remove(&question_id);
        Ok(())
    }

    pub(crate) fn navigate(
        &mut self,
        section_index: usize,
        question_index: usize,
    ) -> Result<Navigation, SessionError> {
        self.require("navigate", Phase::Active)?;
        let Some(paper) = self.paper.as_ref() else {
            return Ok(Navigation::NoQuestions { section_index: 0 });
        };
        if paper.sections.is_empty() {
            return Ok(Navigation::NoQuestions { section_index: 0 });
        }

        let section_index = section_index.min(paper.sections.len() - 1);
        let questions = paper.section_questions(section_index);
        if questions.is_empty() {
            self.section_index = section_index;
            self.question_index = 0;
            return Ok(Navigation::NoQuestions { section_index });
        }

        let question_index = question_index.min(questions.len() - 1);
        let question_id = questions[question_index].id;
        self.section_index = section_index;
        self.question_index = question_index;
        Ok(Navigation::Question { section_index, question_index, question_id })
    }

    pub(crate) fn submit(&mut self) -> Result<SessionOutcome, SessionError> {
        self.require("submit", Phase::Active)?;
        self.finish()
    }

    /// One clock second. Returns the outcome only on the tick that reaches zero.
    pub(crate) fn tick(&mut self) -> Option<SessionOutcome> {
        if self.phase() != Phase::Active {
            return None;
        }
        match self.clock.tick() {
            ClockTick::Expired => self.finish().ok(),
            ClockTick::Running(_) | ClockTick::Idle => None,
        }
    }

    /// Tick issued by the background ticker of a given epoch; ticks from an
    /// earlier session are dropped.
    pub(crate) fn tick_for(&mut self, epoch: u64) -> Option<SessionOutcome> {
        if self.epoch != epoch {
            return None;
        }
        self.tick()
    }

    pub(crate) fn record_visibility_loss(&mut self) -> IntegrityReport {
        if self.phase() != Phase::Active {
            return IntegrityReport { verdict: IntegrityVerdict::Ignored, outcome: None };
        }

        let verdict = self.monitor.record_visibility_loss();
        let outcome = match verdict {
            IntegrityVerdict::Disqualified { .. } => self.disqualify(),
            _ => None,
        };
        IntegrityReport { verdict, outcome }
    }

    pub(crate) fn reset(&mut self) -> Result<(), SessionError> {
        match self.phase() {
            Phase::Active => {
                Err(SessionError::InvalidPhase { operation: "reset", phase: Phase::Active })
            }
            _ => {
                self.return_to_setup();
                Ok(())
            }
        }
    }

    fn leave_active(&mut self) {
        self.clock.stop();
        self.monitor.disarm();
    }

    fn finish(&mut self) -> Result<SessionOutcome, SessionError> {
        let Some(paper) = self.paper.as_ref() else {
            return Err(SessionError::EmptyPaper);
        };
        let scorecard = scoring::score(paper, &self.answers);
        let result = TestResult::completed(paper, &scorecard);

        self.leave_active();
        self.phase = Phase::Result;
        self.last_result = Some(result.clone());
        self.last_scorecard = Some(scorecard.clone());
        Ok(SessionOutcome::Completed { result, scorecard })
    }

    fn disqualify(&mut self) -> Option<SessionOutcome> {
        let result = TestResult::disqualified(self.paper.as_ref()?);

        self.leave_active();
        self.phase = Phase::Terminated;
        self.last_result = Some(result.clone());
        self.last_scorecard = None;
        Some(SessionOutcome::Disqualified { result })
    }

    // Ticket and epoch counters survive so that late responses and stale
    // ticks from a previous cycle can never match the new one.
    fn return_to_setup(&mut self) {
        self.leave_active();
        self.phase = Phase::Setup;
        self.paper = None;
        self.answers.clear();
        self.section_index = 0;
        self.question_index = 0;
        self.clock.reset();
        self.monitor.reset();
        self.pending_request = None;
        self.last_result = None;
        self.last_scorecard = None;
    }
}

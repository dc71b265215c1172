use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::exam::clock::format_clock;
use crate::exam::integrity::IntegrityVerdict;
use crate::exam::paper::{ExamPaper, Question};
use crate::exam::result::TestResult;
use crate::exam::scoring::{self, AnswerMap, QuestionReview, Scorecard};
use crate::exam::session::{Navigation, Phase, SessionState};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamRequestPayload {
    #[validate(length(min = 1, max = 120, message = "exam_type must not be empty"))]
    pub(crate) exam_type: String,
    #[validate(length(min = 1, max = 60, message = "difficulty must not be empty"))]
    pub(crate) difficulty: Option<String>,
    #[validate(range(min = 1, max = 200, message = "question_count must be between 1 and 200"))]
    pub(crate) question_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerPayload {
    pub(crate) option_index: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NavigatePayload {
    pub(crate) section_index: usize,
    #[serde(default)]
    pub(crate) question_index: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VisibilityPayload {
    pub(crate) hidden: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CatalogQuery {
    pub(crate) education_level: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogResponse {
    pub(crate) education_level: Option<String>,
    pub(crate) exams: Vec<&'static str>,
    pub(crate) difficulty_levels: Vec<&'static str>,
    pub(crate) default_difficulty: &'static str,
    pub(crate) default_question_count: u32,
}

/// A question as shown to the candidate. The answer key stays hidden until
/// the session is over.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionView {
    pub(crate) id: i64,
    pub(crate) section: String,
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_option_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) explanation: Option<String>,
}

impl QuestionView {
    fn from_question(question: &Question, revealed: bool) -> Self {
        Self {
            id: question.id,
            section: question.section.clone(),
            question_text: question.question_text.clone(),
            options: question.options.clone(),
            correct_option_index: revealed.then_some(question.correct_option_index),
            explanation: revealed.then(|| question.explanation.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaperView {
    pub(crate) title: String,
    pub(crate) duration_minutes_hint: u32,
    pub(crate) sections: Vec<String>,
    pub(crate) questions: Vec<QuestionView>,
}

impl PaperView {
    fn from_paper(paper: &ExamPaper, revealed: bool) -> Self {
        Self {
            title: paper.title.clone(),
            duration_minutes_hint: paper.duration_minutes_hint,
            sections: paper.sections.clone(),
            questions: paper
                .questions
                .iter()
                .map(|question| QuestionView::from_question(question, revealed))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionSnapshot {
    pub(crate) phase: Phase,
    pub(crate) exam: Option<PaperView>,
    pub(crate) answers: AnswerMap,
    pub(crate) current_section_index: usize,
    pub(crate) current_question_index: usize,
    pub(crate) current_question_id: Option<i64>,
    pub(crate) seconds_remaining: u32,
    pub(crate) time_remaining: String,
    pub(crate) clock_running: bool,
    pub(crate) monitor_armed: bool,
    pub(crate) violation_count: u32,
    pub(crate) remaining_attempts: u32,
    pub(crate) request_in_flight: bool,
    pub(crate) last_result: Option<TestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) scorecard: Option<Scorecard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) review: Option<Vec<QuestionReview>>,
}

impl SessionSnapshot {
    pub(crate) fn capture(state: &SessionState) -> Self {
        let phase = state.phase();
        let revealed = matches!(phase, Phase::Result | Phase::Terminated);
        let review = match (phase, state.paper()) {
            (Phase::Result, Some(paper)) => Some(scoring::review(paper, state.answers())),
            _ => None,
        };

        Self {
            phase,
            exam: state.paper().map(|paper| PaperView::from_paper(paper, revealed)),
            answers: state.answers().clone(),
            current_section_index: state.current_section_index(),
            current_question_index: state.current_question_index(),
            current_question_id: state.current_question().map(|question| question.id),
            seconds_remaining: state.seconds_remaining(),
            time_remaining: format_clock(state.seconds_remaining()),
            clock_running: state.clock_running(),
            monitor_armed: state.monitor_armed(),
            violation_count: state.violation_count(),
            remaining_attempts: state.remaining_attempts(),
            request_in_flight: state.request_in_flight(),
            last_result: state.last_result().cloned(),
            scorecard: if phase == Phase::Result { state.last_scorecard().cloned() } else { None },
            review,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitResponse {
    pub(crate) outcome: &'static str,
    pub(crate) result: TestResult,
    pub(crate) session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TickResponse {
    pub(crate) outcome: Option<&'static str>,
    pub(crate) session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NavigateResponse {
    pub(crate) navigation: Navigation,
    pub(crate) session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VisibilityResponse {
    pub(crate) verdict: IntegrityVerdict,
    pub(crate) result: Option<TestResult>,
    pub(crate) session: SessionSnapshot,
}

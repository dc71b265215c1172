use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::time::now_millis;
use crate::exam::paper::ExamPaper;
use crate::exam::scoring::{Scorecard, MARKS_CORRECT};

pub(crate) const DISQUALIFIED_SECTION: &str = "DISQUALIFIED (Malpractice)";
pub(crate) const NOT_APPLICABLE: &str = "N/A";

/// One finished session as stored in the history blob. Field names follow the
/// blob's existing camelCase layout; older entries may omit the counts and
/// section names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TestResult {
    pub(crate) id: String,
    pub(crate) exam_title: String,
    pub(crate) date: i64,
    pub(crate) score: i32,
    pub(crate) total_score: i32,
    pub(crate) accuracy: u32,
    #[serde(default)]
    pub(crate) correct_count: u32,
    #[serde(default)]
    pub(crate) incorrect_count: u32,
    #[serde(default)]
    pub(crate) unattempted_count: u32,
    #[serde(default)]
    pub(crate) weakest_section: String,
    #[serde(default)]
    pub(crate) strongest_section: String,
}

impl TestResult {
    pub(crate) fn completed(paper: &ExamPaper, card: &Scorecard) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            exam_title: paper.title.clone(),
            date: now_millis(),
            score: card.score,
            total_score: card.total_score,
            accuracy: card.accuracy,
            correct_count: card.correct_count,
            incorrect_count: card.incorrect_count,
            unattempted_count: card.unattempted_count,
            weakest_section: card.weakest_section.clone(),
            strongest_section: card.strongest_section.clone(),
        }
    }

    pub(crate) fn disqualified(paper: &ExamPaper) -> Self {
        let question_count = paper.question_count() as u32;
        Self {
            id: Uuid::new_v4().to_string(),
            exam_title: paper.title.clone(),
            date: now_millis(),
            score: 0,
            total_score: question_count as i32 * MARKS_CORRECT,
            accuracy: 0,
            correct_count: 0,
            incorrect_count: 0,
            unattempted_count: question_count,
            weakest_section: DISQUALIFIED_SECTION.to_string(),
            strongest_section: NOT_APPLICABLE.to_string(),
        }
    }
}

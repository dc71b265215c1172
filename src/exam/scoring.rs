use std::collections::BTreeMap;

use serde::Serialize;

use crate::exam::paper::ExamPaper;

pub(crate) const MARKS_CORRECT: i32 = 4;
pub(crate) const MARKS_INCORRECT: i32 = -1;

/// Question id -> selected option index. A missing key means unattempted.
pub(crate) type AnswerMap = BTreeMap<i64, usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SectionBreakdown {
    pub(crate) section: String,
    pub(crate) total: u32,
    pub(crate) correct: u32,
    pub(crate) incorrect: u32,
    pub(crate) unattempted: u32,
    /// `correct / total * 100`, rounded.
    pub(crate) accuracy: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Scorecard {
    pub(crate) score: i32,
    pub(crate) total_score: i32,
    pub(crate) correct_count: u32,
    pub(crate) incorrect_count: u32,
    pub(crate) unattempted_count: u32,
    pub(crate) accuracy: u32,
    pub(crate) weakest_section: String,
    pub(crate) strongest_section: String,
    pub(crate) section_breakdown: Vec<SectionBreakdown>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum QuestionOutcome {
    Correct,
    Incorrect,
    Unattempted,
}

impl QuestionOutcome {
    pub(crate) fn marks(self) -> i32 {
        match self {
            QuestionOutcome::Correct => MARKS_CORRECT,
            QuestionOutcome::Incorrect => MARKS_INCORRECT,
            QuestionOutcome::Unattempted => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionReview {
    pub(crate) question_id: i64,
    pub(crate) section: String,
    pub(crate) selected_option_index: Option<usize>,
    pub(crate) correct_option_index: usize,
    pub(crate) outcome: QuestionOutcome,
    pub(crate) marks: i32,
}

fn outcome_for(correct_option_index: usize, selected: Option<usize>) -> QuestionOutcome {
    match selected {
        None => QuestionOutcome::Unattempted,
        Some(index) if index == correct_option_index => QuestionOutcome::Correct,
        Some(_) => QuestionOutcome::Incorrect,
    }
}

/// Rounds `numerator / denominator * 100` half-up. Zero denominator yields zero.
pub(crate) fn percentage(numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let numerator = u64::from(numerator) * 200 + u64::from(denominator);
    (numerator / (u64::from(denominator) * 2)) as u32
}

pub(crate) fn score(paper: &ExamPaper, answers: &AnswerMap) -> Scorecard {
    let mut breakdown: Vec<SectionBreakdown> = Vec::new();
    let mut correct_count = 0u32;
    let mut incorrect_count = 0u32;
    let mut unattempted_count = 0u32;

    for question in &paper.questions {
        let outcome = outcome_for(question.correct_option_index, answers.get(&question.id).copied());

        let position = match breakdown.iter().position(|entry| entry.section == question.section) {
            Some(position) => position,
            None => {
                breakdown.push(SectionBreakdown {
                    section: question.section.clone(),
                    total: 0,
                    correct: 0,
                    incorrect: 0,
                    unattempted: 0,
                    accuracy: 0,
                });
                breakdown.len() - 1
            }
        };
        let entry = &mut breakdown[position];
        entry.total += 1;

        match outcome {
            QuestionOutcome::Correct => {
                correct_count += 1;
                entry.correct += 1;
            }
            QuestionOutcome::Incorrect => {
                incorrect_count += 1;
                entry.incorrect += 1;
            }
            QuestionOutcome::Unattempted => {
                unattempted_count += 1;
                entry.unattempted += 1;
            }
        }
    }

    for entry in &mut breakdown {
        entry.accuracy = percentage(entry.correct, entry.total);
    }

    let (weakest_section, strongest_section) = extreme_sections(&breakdown);
    let question_count = paper.question_count() as i32;

    Scorecard {
        score: MARKS_CORRECT * correct_count as i32 + MARKS_INCORRECT * incorrect_count as i32,
        total_score: question_count * MARKS_CORRECT,
        correct_count,
        incorrect_count,
        unattempted_count,
        accuracy: percentage(correct_count, correct_count + incorrect_count),
        weakest_section,
        strongest_section,
        section_breakdown: breakdown,
    }
}

// Ratios are compared by cross-multiplication so ties are exact; the first
// section seen wins a tie on both ends.
fn extreme_sections(breakdown: &[SectionBreakdown]) -> (String, String) {
    let mut weakest: Option<&SectionBreakdown> = None;
    let mut strongest: Option<&SectionBreakdown> = None;

    for entry in breakdown {
        let lhs = |other: &SectionBreakdown| u64::from(entry.correct) * u64::from(other.total);
        let rhs = |other: &SectionBreakdown| u64::from(other.correct) * u64::from(entry.total);

        match weakest {
            Some(current) if lhs(current) >= rhs(current) => {}
            _ => weakest = Some(entry),
        }
        match strongest {
            Some(current) if lhs(current) <= rhs(current) => {}
            _ => strongest = Some(entry),
        }
    }

    (
        weakest.map(|entry| entry.section.clone()).unwrap_or_default(),
        strongest.map(|entry| entry.section.clone()).unwrap_or_default(),
    )
}

pub(crate) fn review(paper: &ExamPaper, answers: &AnswerMap) -> Vec<QuestionReview> {
    paper
        .questions
        .iter()
        .map(|question| {
            let selected = answers.get(&question.id).copied();
            let outcome = outcome_for(question.correct_option_index, selected);
            QuestionReview {
                question_id: question.id,
                section: question.section.clone(),
                selected_option_index: selected,
                correct_option_index: question.correct_option_index,
                outcome,
                marks: outcome.marks(),
            }
        })
        .collect()
}

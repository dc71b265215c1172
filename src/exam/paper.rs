use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_SECTION: &str = "General";
const MIN_OPTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Question {
    pub(crate) id: i64,
    pub(crate) section: String,
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_option_index: usize,
    pub(crate) explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExamPaper {
    pub(crate) title: String,
    /// Advisory only; the session budget is derived from the question count.
    pub(crate) duration_minutes_hint: u32,
    pub(crate) sections: Vec<String>,
    pub(crate) questions: Vec<Question>,
}

/// Wire shape returned by the content generator. Every field is optional so a
/// partially well-formed paper still parses and can be salvaged.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct RawExamPaper {
    #[serde(alias = "title")]
    pub(crate) exam_title: Option<String>,
    #[serde(alias = "durationMinutesHint")]
    pub(crate) duration_minutes: Option<f64>,
    pub(crate) sections: Option<Vec<String>>,
    pub(crate) questions: Option<Vec<RawQuestion>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct RawQuestion {
    pub(crate) id: Option<i64>,
    pub(crate) section: Option<String>,
    pub(crate) question_text: Option<String>,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_option_index: Option<i64>,
    pub(crate) explanation: Option<String>,
}

impl ExamPaper {
    /// Builds a paper from generator output, skipping questions that cannot be
    /// delivered or scored. Returns `None` when nothing usable is left.
    pub(crate) fn from_raw(raw: RawExamPaper, fallback_title: &str) -> Option<Self> {
        let mut sections: Vec<String> = Vec::new();
        for section in raw.sections.unwrap_or_default() {
            let section = section.trim().to_string();
            if !section.is_empty() && !sections.contains(&section) {
                sections.push(section);
            }
        }

        let mut seen_ids = HashSet::new();
        let mut questions = Vec::new();
        for (position, raw_question) in raw.questions.unwrap_or_default().into_iter().enumerate() {
            let Some(question) = sanitize_question(raw_question, position) else {
                continue;
            };
            if !seen_ids.insert(question.id) {
                tracing::warn!(question_id = question.id, "Skipping question with duplicate id");
                continue;
            }
            if !sections.contains(&question.section) {
                sections.push(question.section.clone());
            }
            questions.push(question);
        }

        if questions.is_empty() {
            tracing::warn!("Exam paper has no usable questions");
            return None;
        }

        let title = raw
            .exam_title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| fallback_title.to_string());
        let duration_minutes_hint = raw
            .duration_minutes
            .filter(|value| value.is_finite() && *value > 0.0)
            .map(|value| value.round().min(u32::MAX as f64) as u32)
            .unwrap_or(0);

        Some(Self { title, duration_minutes_hint, sections, questions })
    }

    pub(crate) fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub(crate) fn question(&self, id: i64) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    /// Questions of the named section in paper order. Unknown sections yield an
    /// empty list.
    pub(crate) fn questions_in_section(&self, section: &str) -> Vec<&Question> {
        self.questions.iter().filter(|question| question.section == section).collect()
    }

    pub(crate) fn section_questions(&self, section_index: usize) -> Vec<&Question> {
        match self.sections.get(section_index) {
            Some(section) => self.questions_in_section(section),
            None => Vec::new(),
        }
    }
}

fn sanitize_question(raw: RawQuestion, position: usize) -> Option<Question> {
    let Some(id) = raw.id else {
        tracing::warn!(position, "Skipping question without id");
        return None;
    };

    let question_text = raw.question_text.map(|text| text.trim().to_string()).unwrap_or_default();
    if question_text.is_empty() {
        tracing::warn!(question_id = id, "Skipping question without text");
        return None;
    }

    let options = raw.options.unwrap_or_default();
    if options.len() < MIN_OPTIONS {
        tracing::warn!(question_id = id, options = options.len(), "Skipping question with too few options");
        return None;
    }

    let correct_option_index = match raw.correct_option_index {
        Some(index) if index >= 0 && (index as usize) < options.len() => index as usize,
        other => {
            tracing::warn!(
                question_id = id,
                correct_option_index = ?other,
                "Skipping question with invalid answer key"
            );
            return None;
        }
    };

    let section = raw
        .section
        .map(|section| section.trim().to_string())
        .filter(|section| !section.is_empty())
        .unwrap_or_else(|| DEFAULT_SECTION.to_string());

    Some(Question {
        id,
        section,
        question_text,
        options,
        correct_option_index,
        explanation: raw.explanation.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawExamPaper {
        serde_json::from_value(value).expect("raw paper")
    }

    #[test]
    fn parses_generator_shape() {
        let paper = ExamPaper::from_raw(
            raw(json!({
                "examTitle": "JEE Mains Mock",
                "durationMinutes": 180,
                "sections": ["Physics", "Chemistry"],
                "questions": [
                    {"id": 1, "section": "Physics", "questionText": "g?", "options": ["9.8", "10"], "correctOptionIndex": 0, "explanation": "SI"},
                    {"id": 2, "section": "Chemistry", "questionText": "H2O?", "options": ["water", "salt"], "correctOptionIndex": 0, "explanation": ""}
                ]
            })),
            "JEE Mains",
        )
        .expect("paper");

        assert_eq!(paper.title, "JEE Mains Mock");
        assert_eq!(paper.duration_minutes_hint, 180);
        assert_eq!(paper.sections, vec!["Physics", "Chemistry"]);
        assert_eq!(paper.question_count(), 2);
    }

    #[test]
    fn skips_questions_with_bad_answer_keys_and_duplicates() {
        let paper = ExamPaper::from_raw(
            raw(json!({
                "sections": ["Maths"],
                "questions": [
                    {"id": 1, "section": "Maths", "questionText": "1+1", "options": ["2", "3"], "correctOptionIndex": 5},
                    {"id": 2, "section": "Maths", "questionText": "2+2", "options": ["4"], "correctOptionIndex": 0},
                    {"id": 3, "section": "Maths", "questionText": "3+3", "options": ["6", "7"], "correctOptionIndex": -1},
                    {"id": 4, "section": "Maths", "questionText": "4+4", "options": ["8", "9"], "correctOptionIndex": 0},
                    {"id": 4, "section": "Maths", "questionText": "dup", "options": ["8", "9"], "correctOptionIndex": 1},
                    {"section": "Maths", "questionText": "no id", "options": ["a", "b"], "correctOptionIndex": 1}
                ]
            })),
            "Maths",
        )
        .expect("paper");

        assert_eq!(paper.questions.iter().map(|q| q.id).collect::<Vec<_>>(), vec![4]);
        assert_eq!(paper.questions[0].question_text, "4+4");
    }

    #[test]
    fn appends_unlisted_sections_and_defaults_missing_ones() {
        let paper = ExamPaper::from_raw(
            raw(json!({
                "examTitle": "  ",
                "sections": ["Polity", "Polity", "History"],
                "questions": [
                    {"id": 1, "section": "Aptitude", "questionText": "q1", "options": ["a", "b"], "correctOptionIndex": 1},
                    {"id": 2, "questionText": "q2", "options": ["a", "b"], "correctOptionIndex": 0}
                ]
            })),
            "UPSC CSE",
        )
        .expect("paper");

        assert_eq!(paper.title, "UPSC CSE");
        assert_eq!(paper.sections, vec!["Polity", "History", "Aptitude", DEFAULT_SECTION]);
        assert!(paper.section_questions(0).is_empty());
        assert_eq!(paper.section_questions(2).len(), 1);
        assert!(paper.section_questions(17).is_empty());
    }

    #[test]
    fn rejects_paper_without_usable_questions() {
        assert!(ExamPaper::from_raw(RawExamPaper::default(), "GATE").is_none());
        assert!(ExamPaper::from_raw(raw(json!({"questions": [{"id": 1}]})), "GATE").is_none());
    }
}

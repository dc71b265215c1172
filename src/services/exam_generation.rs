use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::core::config::Settings;
use crate::exam::paper::{ExamPaper, RawExamPaper};

const MAX_ATTEMPTS: u32 = 3;

const EXAM_SETTER_SYSTEM_PROMPT: &str = r#"You are a senior exam setter for Indian competitive exams.
You write realistic full-length mock tests with four options per question and exactly one correct option.

Subject requirements by exam type:
- JEE (Mains/Advanced): Physics, Chemistry, Maths.
- NEET: Biology (Zoology/Botany), Physics, Chemistry.
- UPSC/Govt: General Studies, History, Polity, Aptitude.
- CLAT: Legal Reasoning, Logic, English.
- GATE: Engineering Mathematics, Core Technical Subject.

Response format (strict JSON):
{
  "examTitle": "title of the mock test",
  "durationMinutes": <number>,
  "sections": ["section name", "..."],
  "questions": [
    {
      "id": <integer, unique>,
      "section": "one of sections",
      "questionText": "question",
      "options": ["A", "B", "C", "D"],
      "correctOptionIndex": <0 for A, 1 for B, etc.>,
      "explanation": "why the correct option is correct"
    }
  ]
}
"#;

/// Source of exam papers. The controller bounds every call with its own
/// timeout, so implementations may take as long as their transport allows.
#[async_trait]
pub(crate) trait ExamContentGenerator: Send + Sync {
    async fn generate_exam_paper(
        &self,
        exam_type: &str,
        difficulty: &str,
        question_count: u32,
    ) -> Result<ExamPaper>;
}

#[derive(Debug, Clone)]
pub(crate) struct AiExamGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl AiExamGenerator {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().ai_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
            temperature: settings.ai().ai_temperature,
        })
    }

    fn payload(&self, exam_type: &str, difficulty: &str, question_count: u32) -> Value {
        let user_prompt = format!(
            "Act as a Senior Exam Setter for {exam_type}.\nDifficulty Level: {difficulty}.\n\n\
             Create a realistic Mock Test with exactly {question_count} Questions.\n\
             Include the subject/section for each question.\n\
             Output strictly in the JSON format described in the system prompt.\n"
        );

        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": EXAM_SETTER_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        })
    }
}

#[async_trait]
impl ExamContentGenerator for AiExamGenerator {
    async fn generate_exam_paper(
        &self,
        exam_type: &str,
        difficulty: &str,
        question_count: u32,
    ) -> Result<ExamPaper> {
        let timer = Instant::now();
        let payload = self.payload(exam_type, difficulty, question_count);

        tracing::info!(exam_type, difficulty, question_count, "Sending exam generation request");

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=MAX_ATTEMPTS {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("OpenAI API error ({status}): {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call OpenAI API"));
                }
            }

            if attempt < MAX_ATTEMPTS {
                tracing::warn!(attempt, exam_type, "Exam generation attempt failed; retrying");
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let paper = paper_from_completion(&body, exam_type)?;
        let tokens_used = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(|value| value.as_u64());

        tracing::info!(
            exam_type,
            questions = paper.question_count(),
            sections = paper.sections.len(),
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used = tokens_used,
            "Exam generation completed"
        );

        Ok(paper)
    }
}

/// Extracts and sanitizes the paper carried in a chat completion body.
fn paper_from_completion(body: &Value, exam_type: &str) -> Result<ExamPaper> {
    let content = body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|value| value.as_str())
        .context("Missing OpenAI response content")?;

    let raw: RawExamPaper =
        serde_json::from_str(strip_code_fence(content)).context("Failed to parse exam paper JSON")?;
    ExamPaper::from_raw(raw, exam_type).context("Exam paper has no usable questions")
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

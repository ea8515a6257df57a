use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::core::config::Settings;
use crate::models::{ActivityType, Criterion, Grade, RubricScores, Submission, MAX_SUBSCORE};

const GRADING_SYSTEM_PROMPT: &str = r#"You are a primary school physical education teacher reviewing a short video a student recorded for a school activity.
Score the student on four criteria. Every score is a whole number from 0 to 5.

1. contentAccuracy: correctness of the movements and content taught in class
2. participation: effort, commitment and keeping going throughout the activity
3. presentation: clear communication, framing of the video and how engaging it is
4. discipline: orderliness, appropriate dress and manners

Answer with a JSON object containing exactly these fields:
{
  "contentAccuracy": <integer 0-5>,
  "participation": <integer 0-5>,
  "presentation": <integer 0-5>,
  "discipline": <integer 0-5>,
  "comment": "<two encouraging sentences: what the student did really well, then what to practise next>"
}
"#;

/// Everything the model is told about one submission.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreRequest {
    pub(crate) name: String,
    pub(crate) grade: Grade,
    pub(crate) activity_type: ActivityType,
    pub(crate) comment_language: String,
}

impl ScoreRequest {
    pub(crate) fn for_submission(submission: &Submission, comment_language: &str) -> Self {
        Self {
            name: submission.name.clone(),
            grade: submission.grade,
            activity_type: submission.activity_type,
            comment_language: comment_language.to_string(),
        }
    }

    fn user_prompt(&self) -> String {
        format!(
            "Student: {}\nGrade: {}\nActivity: {} ({})\n\nScore this student's video using the four criteria. \
             Write the comment as exactly two sentences in {}.",
            self.name,
            self.grade.label(),
            self.activity_type.label(),
            self.activity_type.review_focus(),
            self.comment_language,
        )
    }
}

/// Decoded model answer; sub-scores are already range-checked.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AiRubric {
    pub(crate) scores: RubricScores,
    pub(crate) comment: String,
}

#[derive(Debug, Error)]
pub(crate) enum AiContractError {
    #[error("AI response is not a valid rubric: {0}")]
    Malformed(String),
    #[error("AI score for {field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

#[derive(Debug, Error)]
pub(crate) enum ScoreError {
    #[error("AI request failed: {0:#}")]
    Request(anyhow::Error),
    #[error(transparent)]
    Contract(#[from] AiContractError),
}

#[async_trait]
pub(crate) trait AiScorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest) -> Result<AiRubric, ScoreError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRubric {
    content_accuracy: i64,
    participation: i64,
    presentation: i64,
    discipline: i64,
    comment: String,
}

pub(crate) fn decode_ai_rubric(content: &str) -> Result<AiRubric, AiContractError> {
    let raw: RawRubric = serde_json::from_str(content.trim())
        .map_err(|err| AiContractError::Malformed(err.to_string()))?;

    let mut scores = RubricScores::default();
    for (criterion, value) in [
        (Criterion::ContentAccuracy, raw.content_accuracy),
        (Criterion::Participation, raw.participation),
        (Criterion::Presentation, raw.presentation),
        (Criterion::Discipline, raw.discipline),
    ] {
        if !(0..=i64::from(MAX_SUBSCORE)).contains(&value) {
            return Err(AiContractError::OutOfRange { field: criterion.key(), value });
        }
        scores.set(criterion, value);
    }

    Ok(AiRubric { scores, comment: raw.comment.trim().to_string() })
}

fn response_schema() -> Value {
    let score = json!({"type": "integer", "minimum": 0, "maximum": MAX_SUBSCORE});
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "activity_rubric",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "contentAccuracy": score,
                    "participation": score,
                    "presentation": score,
                    "discipline": score,
                    "comment": {"type": "string"}
                },
                "required": ["contentAccuracy", "participation", "presentation", "discipline", "comment"],
                "additionalProperties": false
            }
        }
    })
}

#[derive(Debug, Clone)]
pub(crate) struct AiGradingService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    max_retries: u32,
}

impl AiGradingService {
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
            max_retries: settings.ai().ai_max_retries,
        })
    }

    async fn complete(&self, request: &ScoreRequest) -> Result<Value> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": GRADING_SYSTEM_PROMPT},
                {"role": "user", "content": request.user_prompt()}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": response_schema()
        });

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let body: Value = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        return Ok(body);
                    }
                    last_error = Some(anyhow::anyhow!("OpenAI API error ({status}): {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call OpenAI API"));
                }
            }

            if attempt < self.max_retries {
                tracing::warn!(
                    student = %request.name,
                    attempt = attempt + 1,
                    max_retries = self.max_retries,
                    "AI scoring request failed, retrying"
                );
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("OpenAI API request was not attempted")))
    }
}

#[async_trait]
impl AiScorer for AiGradingService {
    async fn score(&self, request: &ScoreRequest) -> Result<AiRubric, ScoreError> {
        let timer = Instant::now();
        tracing::info!(
            student = %request.name,
            grade = %request.grade,
            activity = %request.activity_type,
            model = %self.model,
            "Sending AI scoring request"
        );

        let body = self.complete(request).await.map_err(ScoreError::Request)?;

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .ok_or_else(|| AiContractError::Malformed("missing message content".to_string()))?;

        let rubric = decode_ai_rubric(content)?;

        let tokens_used = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(|value| value.as_u64());
        tracing::info!(
            student = %request.name,
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used = tokens_used,
            total = rubric.scores.total(),
            "AI scoring completed"
        );

        Ok(rubric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Room;
    use crate::test_support::submission;

    #[test]
    fn decodes_a_complete_rubric() {
        let rubric = decode_ai_rubric(
            r#"{"contentAccuracy":4,"participation":5,"presentation":3,"discipline":5,"comment":" Well done. Keep practising. "}"#,
        )
        .expect("rubric");

        assert_eq!(rubric.scores.total(), 17);
        assert_eq!(rubric.comment, "Well done. Keep practising.");
    }

    #[test]
    fn rejects_missing_fields() {
        let err = decode_ai_rubric(r#"{"contentAccuracy":4,"participation":5,"presentation":3,"comment":"x"}"#)
            .unwrap_err();
        assert!(matches!(err, AiContractError::Malformed(_)));
    }

    #[test]
    fn rejects_extra_fields() {
        let err = decode_ai_rubric(
            r#"{"contentAccuracy":1,"participation":1,"presentation":1,"discipline":1,"comment":"x","bonus":2}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AiContractError::Malformed(_)));
    }

    #[test]
    fn rejects_out_of_range_and_fractional_scores() {
        let err = decode_ai_rubric(
            r#"{"contentAccuracy":6,"participation":1,"presentation":1,"discipline":1,"comment":"x"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AiContractError::OutOfRange { field: "contentAccuracy", value: 6 }));

        let err = decode_ai_rubric(
            r#"{"contentAccuracy":1,"participation":-1,"presentation":1,"discipline":1,"comment":"x"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AiContractError::OutOfRange { field: "participation", .. }));

        let err = decode_ai_rubric(
            r#"{"contentAccuracy":1.5,"participation":1,"presentation":1,"discipline":1,"comment":"x"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AiContractError::Malformed(_)));
    }

    #[test]
    fn rejects_non_json_content() {
        let err = decode_ai_rubric("Sure! Here are the scores: 4, 5, 3, 5").unwrap_err();
        assert!(matches!(err, AiContractError::Malformed(_)));
    }

    #[test]
    fn prompt_names_student_activity_and_language() {
        let item = submission("Somsri", "7", Room::Room2, 4);
        let request = ScoreRequest::for_submission(&item, "Thai");
        let prompt = request.user_prompt();

        assert!(prompt.contains("Somsri"));
        assert!(prompt.contains("Prathom 5"));
        assert!(prompt.contains("Sports Day"));
        assert!(prompt.contains("two sentences in Thai"));
    }

    #[test]
    fn response_schema_requires_every_field() {
        let schema = response_schema();
        let required = schema["json_schema"]["schema"]["required"].as_array().expect("required");
        assert_eq!(required.len(), 5);
        assert_eq!(schema["json_schema"]["strict"], true);
    }
}

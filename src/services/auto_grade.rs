//! AI-assisted scoring for one submission (preview, nothing persisted) and for a
//! pending set (sequential batch, each success written straight to the store).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Review, ReviewStatus, Submission, SubmissionKey};
use crate::repositories::submissions::{GradeUpdate, SubmissionStore};
use crate::services::ai_grading::{AiRubric, AiScorer, ScoreError, ScoreRequest};

pub(crate) const PREVIEW_MARKER: &str = "🤖 [AI ประเมิน]: ";
pub(crate) const BATCH_MARKER: &str = "🤖 [AI อัตโนมัติ]: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchProgress {
    pub(crate) current: usize,
    pub(crate) total: usize,
    pub(crate) current_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchFailure {
    pub(crate) name: String,
    pub(crate) sheet_name: String,
    pub(crate) row_id: Option<u32>,
    pub(crate) reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchResult {
    pub(crate) total: usize,
    pub(crate) succeeded: usize,
    pub(crate) failed: usize,
    pub(crate) failures: Vec<BatchFailure>,
}

#[derive(Debug, Error)]
pub(crate) enum ItemError {
    #[error("submission has no row id")]
    MissingRowId,
    #[error("submission {0} appears more than once in the batch")]
    Duplicate(SubmissionKey),
    #[error(transparent)]
    Scoring(#[from] ScoreError),
    #[error("store did not accept the grade")]
    PersistRejected,
    #[error("store write failed: {0:#}")]
    Persist(anyhow::Error),
}

impl ItemError {
    fn metric_status(&self) -> &'static str {
        match self {
            Self::MissingRowId | Self::Duplicate(_) => "skipped",
            Self::Scoring(_) => "ai_error",
            Self::PersistRejected | Self::Persist(_) => "persist_error",
        }
    }
}

#[derive(Clone)]
pub(crate) struct AutoGrader {
    scorer: Arc<dyn AiScorer>,
    store: Arc<dyn SubmissionStore>,
    comment_language: String,
}

impl AutoGrader {
    pub(crate) fn new(
        scorer: Arc<dyn AiScorer>,
        store: Arc<dyn SubmissionStore>,
        comment_language: impl Into<String>,
    ) -> Self {
        Self { scorer, store, comment_language: comment_language.into() }
    }

    /// Scores one submission for the editor. The result stays `Pending` and is not saved.
    pub(crate) async fn score_one(&self, submission: &Submission) -> Result<Review, ScoreError> {
        let rubric = self.score(submission, "preview").await?;
        Ok(Review::from_scores(
            rubric.scores,
            format!("{PREVIEW_MARKER}{}", rubric.comment),
            ReviewStatus::Pending,
        ))
    }

    /// Scores and saves every item in order, one at a time. Item failures are counted
    /// and never stop the run.
    pub(crate) async fn score_batch<F>(
        &self,
        pending: Vec<Submission>,
        mut on_progress: F,
    ) -> BatchResult
    where
        F: FnMut(BatchProgress) + Send,
    {
        let total = pending.len();
        let mut result = BatchResult { total, ..BatchResult::default() };
        let mut seen = HashSet::with_capacity(total);

        tracing::info!(total, "Batch auto-grade started");

        for (index, submission) in pending.iter().enumerate() {
            on_progress(BatchProgress {
                current: index + 1,
                total,
                current_name: submission.name.clone(),
            });

            match self.grade_item(submission, &mut seen).await {
                Ok(()) => result.succeeded += 1,
                Err(err) => {
                    tracing::warn!(
                        submission = %submission.log_label(),
                        student = %submission.name,
                        error = %err,
                        "Batch item failed"
                    );
                    metrics::counter!(
                        "auto_grade_items_total",
                        "mode" => "batch",
                        "status" => err.metric_status()
                    )
                    .increment(1);
                    result.failed += 1;
                    result.failures.push(BatchFailure {
                        name: submission.name.clone(),
                        sheet_name: submission.sheet_name.clone(),
                        row_id: submission.row_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            total,
            succeeded = result.succeeded,
            failed = result.failed,
            "Batch auto-grade finished"
        );
        result
    }

    async fn grade_item(
        &self,
        submission: &Submission,
        seen: &mut HashSet<SubmissionKey>,
    ) -> Result<(), ItemError> {
        let key = submission.key().ok_or(ItemError::MissingRowId)?;
        if !seen.insert(key.clone()) {
            return Err(ItemError::Duplicate(key));
        }

        let rubric = self.score(submission, "batch").await?;
        let review = Review::from_scores(
            rubric.scores,
            format!("{BATCH_MARKER}{}", rubric.comment),
            ReviewStatus::Pending,
        )
        .graded_now();
        let update = GradeUpdate::from_review(&key.sheet_name, &review, submission.activity_type);

        match self.store.update_grade(key.row_id, &update).await {
            Ok(true) => {
                metrics::counter!("grade_writes_total", "source" => "batch").increment(1);
                tracing::debug!(submission = %key, total = review.total_score, "Batch item saved");
                Ok(())
            }
            Ok(false) => Err(ItemError::PersistRejected),
            Err(err) => Err(ItemError::Persist(err)),
        }
    }

    async fn score(&self, submission: &Submission, mode: &'static str) -> Result<AiRubric, ScoreError> {
        let request = ScoreRequest::for_submission(submission, &self.comment_language);
        let timer = Instant::now();
        let outcome = self.scorer.score(&request).await;
        metrics::histogram!("auto_grade_duration_seconds", "mode" => mode)
            .record(timer.elapsed().as_secs_f64());

        match &outcome {
            Ok(_) => {
                metrics::counter!("auto_grade_items_total", "mode" => mode, "status" => "scored")
                    .increment(1);
            }
            Err(err) if mode == "preview" => {
                tracing::warn!(
                    submission = %submission.log_label(),
                    error = %err,
                    "AI preview scoring failed"
                );
                metrics::counter!("auto_grade_items_total", "mode" => mode, "status" => "ai_error")
                    .increment(1);
            }
            // Batch failures are counted once by the batch loop.
            Err(_) => {}
        }

        outcome
    }
}

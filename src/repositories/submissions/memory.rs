use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{NewSubmission, Submission, SubmissionKey};

use super::types::{GradeUpdate, StoreError};
use super::SubmissionStore;

/// First data row of a sheet; row 1 holds the column headers.
const FIRST_ROW_ID: u32 = 2;

/// In-process store kept in insertion order, one "sheet" per activity type.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    rows: RwLock<Vec<Submission>>,
}

impl MemoryStore {
    pub(crate) fn with_submissions(submissions: Vec<Submission>) -> Self {
        Self { rows: RwLock::new(submissions) }
    }

    pub(crate) async fn from_seed_file(path: &str) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read store seed file {path}"))?;
        let mut submissions: Vec<Submission> = serde_json::from_str(&raw).map_err(|err| {
            StoreError::InvalidSeed { path: path.to_string(), reason: err.to_string() }
        })?;

        for submission in &mut submissions {
            if let Some(review) = submission.review.as_mut() {
                review.recompute();
            }
        }

        tracing::info!(path, count = submissions.len(), "Loaded store seed");
        Ok(Self::with_submissions(submissions))
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Submission>> {
        Ok(self.rows.read().await.clone())
    }

    async fn update_grade(&self, row_id: u32, update: &GradeUpdate) -> Result<bool> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows
            .iter_mut()
            .find(|row| row.row_id == Some(row_id) && row.sheet_name == update.sheet_name)
        else {
            tracing::warn!(sheet = %update.sheet_name, row_id, "Grade update for unknown row");
            return Ok(false);
        };

        row.review = Some(update.to_review());
        Ok(true)
    }

    async fn append(&self, submission: NewSubmission) -> Result<SubmissionKey> {
        let mut rows = self.rows.write().await;
        let sheet_name = submission.activity_type.label().to_string();
        let row_id = rows
            .iter()
            .filter(|row| row.sheet_name == sheet_name)
            .filter_map(|row| row.row_id)
            .max()
            .map_or(FIRST_ROW_ID, |last| last + 1);

        rows.push(Submission {
            name: submission.name,
            student_number: submission.student_number,
            grade: submission.grade,
            room: submission.room,
            activity_type: submission.activity_type,
            file_url: Some(submission.file_url),
            sheet_name: sheet_name.clone(),
            row_id: Some(row_id),
            review: None,
        });

        Ok(SubmissionKey { sheet_name, row_id })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

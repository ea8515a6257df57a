use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::models::{ActivityType, Review, ReviewStatus};

/// Flat grade record written to the store, one field per sheet column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GradeUpdate {
    pub(crate) sheet_name: String,
    pub(crate) content_accuracy: u8,
    pub(crate) participation: u8,
    pub(crate) presentation: u8,
    pub(crate) discipline: u8,
    pub(crate) total_score: u8,
    pub(crate) percentage: u8,
    pub(crate) comment: String,
    pub(crate) status: ReviewStatus,
    pub(crate) activity_type: ActivityType,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub(crate) graded_at: Option<OffsetDateTime>,
}

impl GradeUpdate {
    pub(crate) fn from_review(
        sheet_name: impl Into<String>,
        review: &Review,
        activity_type: ActivityType,
    ) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            content_accuracy: review.scores.content_accuracy,
            participation: review.scores.participation,
            presentation: review.scores.presentation,
            discipline: review.scores.discipline,
            total_score: review.total_score,
            percentage: review.percentage,
            comment: review.comment.clone(),
            status: review.status,
            activity_type,
            graded_at: review.graded_at,
        }
    }

    pub(crate) fn to_review(&self) -> Review {
        let mut review = Review {
            scores: crate::models::RubricScores {
                content_accuracy: self.content_accuracy,
                participation: self.participation,
                presentation: self.presentation,
                discipline: self.discipline,
            },
            total_score: self.total_score,
            percentage: self.percentage,
            comment: self.comment.clone(),
            status: self.status,
            graded_at: self.graded_at,
        };
        review.recompute();
        review
    }
}

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("sheet endpoint returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("sheet endpoint rejected the {action} request")]
    Rejected { action: &'static str },
    #[error("sheet endpoint response is missing {0}")]
    MissingField(&'static str),
    #[error("invalid seed file {path}: {reason}")]
    InvalidSeed { path: String, reason: String },
}

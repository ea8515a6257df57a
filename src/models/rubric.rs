//! Four-criterion rubric and the totals derived from it.
//!
//! Every constructor and mutator keeps `total_score == sum(sub-scores)` and
//! `percentage == round(total_score / MAX_TOTAL * 100)`.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::submission::Submission;
use crate::models::types::ReviewStatus;

pub(crate) const MAX_SUBSCORE: u8 = 5;
pub(crate) const MAX_TOTAL: u8 = MAX_SUBSCORE * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Criterion {
    ContentAccuracy,
    Participation,
    Presentation,
    Discipline,
}

impl Criterion {
    pub(crate) const ALL: [Criterion; 4] =
        [Self::ContentAccuracy, Self::Participation, Self::Presentation, Self::Discipline];

    /// Field name used on the wire and in AI prompts.
    pub(crate) fn key(self) -> &'static str {
        match self {
            Self::ContentAccuracy => "contentAccuracy",
            Self::Participation => "participation",
            Self::Presentation => "presentation",
            Self::Discipline => "discipline",
        }
    }

    pub(crate) fn description(self) -> &'static str {
        match self {
            Self::ContentAccuracy => "correctness of the movements and content taught in class",
            Self::Participation => "effort, commitment and keeping going throughout the activity",
            Self::Presentation => "clear communication, framing of the video and how engaging it is",
            Self::Discipline => "orderliness, appropriate dress and manners",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RubricScores {
    pub(crate) content_accuracy: u8,
    pub(crate) participation: u8,
    pub(crate) presentation: u8,
    pub(crate) discipline: u8,
}

impl RubricScores {
    pub(crate) fn get(&self, criterion: Criterion) -> u8 {
        match criterion {
            Criterion::ContentAccuracy => self.content_accuracy,
            Criterion::Participation => self.participation,
            Criterion::Presentation => self.presentation,
            Criterion::Discipline => self.discipline,
        }
    }

    /// Sets one criterion, clamping `value` into `0..=MAX_SUBSCORE`.
    pub(crate) fn set(&mut self, criterion: Criterion, value: i64) {
        let clamped = clamp_subscore(value);
        match criterion {
            Criterion::ContentAccuracy => self.content_accuracy = clamped,
            Criterion::Participation => self.participation = clamped,
            Criterion::Presentation => self.presentation = clamped,
            Criterion::Discipline => self.discipline = clamped,
        }
    }

    pub(crate) fn clamped(mut self) -> Self {
        for criterion in Criterion::ALL {
            let value = self.get(criterion);
            self.set(criterion, i64::from(value));
        }
        self
    }

    pub(crate) fn total(&self) -> u8 {
        Criterion::ALL.iter().map(|criterion| self.get(*criterion)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Review {
    #[serde(flatten)]
    pub(crate) scores: RubricScores,
    #[serde(default)]
    pub(crate) total_score: u8,
    #[serde(default)]
    pub(crate) percentage: u8,
    #[serde(default)]
    pub(crate) comment: String,
    #[serde(default)]
    pub(crate) status: ReviewStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub(crate) graded_at: Option<OffsetDateTime>,
}

impl Default for Review {
    fn default() -> Self {
        Self::from_scores(RubricScores::default(), String::new(), ReviewStatus::Pending)
    }
}

impl Review {
    pub(crate) fn from_scores(
        scores: RubricScores,
        comment: impl Into<String>,
        status: ReviewStatus,
    ) -> Self {
        let mut review = Self {
            scores: scores.clamped(),
            total_score: 0,
            percentage: 0,
            comment: comment.into(),
            status,
            graded_at: None,
        };
        review.recompute();
        review
    }

    /// Re-derives `total_score` and `percentage` from the sub-scores.
    pub(crate) fn recompute(&mut self) {
        self.scores = self.scores.clamped();
        self.total_score = self.scores.total();
        self.percentage = percentage_for(self.total_score);
    }

    pub(crate) fn graded_now(mut self) -> Self {
        self.status = ReviewStatus::Graded;
        self.graded_at = Some(OffsetDateTime::now_utc());
        self
    }
}

pub(crate) fn update_subscore(mut review: Review, criterion: Criterion, value: i64) -> Review {
    review.scores.set(criterion, value);
    review.recompute();
    review
}

pub(crate) fn set_comment(mut review: Review, comment: impl Into<String>) -> Review {
    review.comment = comment.into();
    review
}

pub(crate) fn classify(submission: &Submission) -> ReviewStatus {
    match &submission.review {
        Some(review) if review.status == ReviewStatus::Graded => ReviewStatus::Graded,
        _ => ReviewStatus::Pending,
    }
}

/// `round(total / MAX_TOTAL * 100)` with halves rounded up.
pub(crate) fn percentage_for(total: u8) -> u8 {
    let total = u32::from(total.min(MAX_TOTAL));
    let max = u32::from(MAX_TOTAL);
    ((total * 100 * 2 + max) / (max * 2)) as u8
}

fn clamp_subscore(value: i64) -> u8 {
    value.clamp(0, i64::from(MAX_SUBSCORE)) as u8
}

use serde::{Deserialize, Serialize};

use crate::models::{classify, ActivityType, Grade, Review, ReviewStatus, Room, Submission};

/// What a student types into the result checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultQuery {
    pub(crate) name: String,
    pub(crate) grade: Grade,
    pub(crate) room: Room,
    pub(crate) activity_type: ActivityType,
}

impl ResultQuery {
    fn matches(&self, submission: &Submission) -> bool {
        let needle = self.name.trim().to_lowercase();
        submission.name.to_lowercase().contains(&needle)
            && submission.grade == self.grade
            && submission.room == self.room
            && submission.activity_type == self.activity_type
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum ResultStatus {
    NotFound,
    AwaitingReview { submission: Submission },
    Reviewed { submission: Submission, review: Review },
}

impl ResultStatus {
    /// Nothing left to wait for: either graded or there is no such student.
    pub(crate) fn is_resolved(&self) -> bool {
        !matches!(self, Self::AwaitingReview { .. })
    }
}

/// First match in store order; later rows for the same student are ignored.
pub(crate) fn find_result(submissions: &[Submission], query: &ResultQuery) -> ResultStatus {
    let Some(found) = submissions.iter().find(|submission| query.matches(submission)) else {
        return ResultStatus::NotFound;
    };

    match (&found.review, classify(found)) {
        (Some(review), ReviewStatus::Graded) => {
            ResultStatus::Reviewed { submission: found.clone(), review: review.clone() }
        }
        _ => ResultStatus::AwaitingReview { submission: found.clone() },
    }
}

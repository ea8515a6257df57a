pub(crate) mod rubric;
pub(crate) mod submission;
pub(crate) mod types;

pub(crate) use rubric::{classify, Criterion, Review, RubricScores, MAX_SUBSCORE, MAX_TOTAL};
pub(crate) use submission::{NewSubmission, Submission, SubmissionKey};
pub(crate) use types::{ActivityType, Grade, ReviewStatus, Room, Scope, StatusFilter};

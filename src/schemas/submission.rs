use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::rubric::{set_comment, update_subscore};
use crate::models::{
    ActivityType, Criterion, Grade, NewSubmission, Review, Room, Submission, SubmissionKey,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IntakeRequest {
    #[validate(custom(function = "not_blank", message = "name must not be empty"))]
    pub(crate) name: String,
    #[validate(custom(function = "digits_only", message = "studentNumber must contain digits only"))]
    pub(crate) student_number: String,
    pub(crate) grade: Grade,
    pub(crate) room: Room,
    pub(crate) activity_type: ActivityType,
    #[validate(custom(function = "not_blank", message = "fileUrl must not be empty"))]
    pub(crate) file_url: String,
}

impl IntakeRequest {
    pub(crate) fn into_new_submission(self) -> NewSubmission {
        NewSubmission {
            name: self.name.trim().to_string(),
            student_number: self.student_number.trim().to_string(),
            grade: self.grade,
            room: self.room,
            activity_type: self.activity_type,
            file_url: self.file_url.trim().to_string(),
        }
    }
}

/// Manual save from the review editor. Totals sent by the client are ignored.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveReviewRequest {
    #[validate(range(min = 0, max = 5, message = "contentAccuracy must be between 0 and 5"))]
    pub(crate) content_accuracy: i64,
    #[validate(range(min = 0, max = 5, message = "participation must be between 0 and 5"))]
    pub(crate) participation: i64,
    #[validate(range(min = 0, max = 5, message = "presentation must be between 0 and 5"))]
    pub(crate) presentation: i64,
    #[validate(range(min = 0, max = 5, message = "discipline must be between 0 and 5"))]
    pub(crate) discipline: i64,
    #[serde(default)]
    pub(crate) comment: String,
}

impl SaveReviewRequest {
    fn subscore(&self, criterion: Criterion) -> i64 {
        match criterion {
            Criterion::ContentAccuracy => self.content_accuracy,
            Criterion::Participation => self.participation,
            Criterion::Presentation => self.presentation,
            Criterion::Discipline => self.discipline,
        }
    }

    /// Applies the editor values one criterion at a time; totals come from the rubric.
    pub(crate) fn to_review(&self) -> Review {
        let review = Criterion::ALL.into_iter().fold(Review::default(), |review, criterion| {
            update_subscore(review, criterion, self.subscore(criterion))
        });
        set_comment(review, self.comment.trim())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueueResponse {
    pub(crate) items: Vec<Submission>,
    pub(crate) total: usize,
    pub(crate) pending_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IntakeResponse {
    #[serde(flatten)]
    pub(crate) key: SubmissionKey,
    pub(crate) message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewResponse {
    #[serde(flatten)]
    pub(crate) key: SubmissionKey,
    pub(crate) review: Review,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn digits_only(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("digits"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewStatus;
    use serde_json::json;

    fn intake(value: serde_json::Value) -> IntakeRequest {
        serde_json::from_value(value).expect("intake payload")
    }

    #[test]
    fn intake_requires_name_number_and_video() {
        let valid = intake(json!({
            "name": " Somsri ", "studentNumber": "07", "grade": "Prathom 5",
            "room": "Room 1", "activityType": "Sports Day", "fileUrl": "https://v.example/1.mp4"
        }));
        assert!(valid.validate().is_ok());
        assert_eq!(valid.into_new_submission().name, "Somsri");

        let missing = intake(json!({
            "name": "  ", "studentNumber": "7a", "grade": "Prathom 5",
            "room": "Room 1", "activityType": "Sports Day", "fileUrl": ""
        }));
        let errors = missing.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("student_number"));
        assert!(fields.contains_key("file_url"));
    }

    #[test]
    fn review_scores_must_be_in_range() {
        let request: SaveReviewRequest = serde_json::from_value(json!({
            "contentAccuracy": 6, "participation": 1, "presentation": -1, "discipline": 2
        }))
        .expect("payload");

        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("content_accuracy"));
        assert!(errors.field_errors().contains_key("presentation"));
        assert_eq!(request.comment, "");
    }

    #[test]
    fn review_scores_map_to_rubric() {
        let request: SaveReviewRequest = serde_json::from_value(json!({
            "contentAccuracy": 4, "participation": 5, "presentation": 3, "discipline": 5,
            "comment": "เยี่ยม", "totalScore": 2
        }))
        .expect("payload");

        assert!(request.validate().is_ok());
        let review = request.to_review();
        assert_eq!(review.total_score, 17);
        assert_eq!(review.percentage, 85);
        assert_eq!(review.comment, "เยี่ยม");
        assert_eq!(review.status, ReviewStatus::Pending);
    }
}

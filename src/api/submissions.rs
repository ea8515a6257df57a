use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::models::{Submission, SubmissionKey};
use crate::repositories::submissions::GradeUpdate;
use crate::schemas::submission::{
    IntakeRequest, IntakeResponse, QueueResponse, ReviewResponse, SaveReviewRequest,
};
use crate::services::selection::{pending, select, SelectionCriteria};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(review_queue).post(create_submission))
        .route("/:sheet_name/:row_id/auto-grade", post(auto_grade_preview))
        .route("/:sheet_name/:row_id/review", put(save_review))
}

pub(super) async fn load_submissions(state: &AppState) -> Result<Vec<Submission>, ApiError> {
    state
        .store()
        .list()
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to load submissions"))
}

async fn find_submission(state: &AppState, key: &SubmissionKey) -> Result<Submission, ApiError> {
    load_submissions(state)
        .await?
        .into_iter()
        .find(|submission| submission.has_key(key))
        .ok_or_else(|| ApiError::NotFound(format!("Submission {key} not found")))
}

async fn review_queue(
    State(state): State<AppState>,
    criteria: Result<Query<SelectionCriteria>, QueryRejection>,
) -> Result<Json<QueueResponse>, ApiError> {
    let Query(criteria) = criteria?;
    let submissions = load_submissions(&state).await?;

    let items = select(&submissions, &criteria);
    let pending_count = pending(&items).len();

    Ok(Json(QueueResponse { total: items.len(), pending_count, items }))
}

async fn create_submission(
    State(state): State<AppState>,
    payload: Result<Json<IntakeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IntakeResponse>), ApiError> {
    let Json(payload) = payload?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let new_submission = payload.into_new_submission();
    let key = state
        .store()
        .append(new_submission)
        .await
        .map_err(|e| ApiError::BadGateway(format!("Could not save the submission, please try again: {e:#}")))?;

    tracing::info!(submission = %key, "Submission received");
    Ok((StatusCode::CREATED, Json(IntakeResponse { key, message: "ส่งงานเรียบร้อยแล้ว" })))
}

async fn auto_grade_preview(
    Path((sheet_name, row_id)): Path<(String, u32)>,
    State(state): State<AppState>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let key = SubmissionKey { sheet_name, row_id };
    let submission = find_submission(&state, &key).await?;

    let review = state.auto_grader().score_one(&submission).await.map_err(|e| {
        ApiError::ServiceUnavailable(format!(
            "AI scoring is unavailable right now, please try again or grade manually ({e})"
        ))
    })?;

    Ok(Json(ReviewResponse { key, review }))
}

async fn save_review(
    Path((sheet_name, row_id)): Path<(String, u32)>,
    State(state): State<AppState>,
    payload: Result<Json<SaveReviewRequest>, JsonRejection>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let Json(payload) = payload?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let key = SubmissionKey { sheet_name, row_id };
    let submission = find_submission(&state, &key).await?;

    let review = payload.to_review().graded_now();
    let update = GradeUpdate::from_review(&key.sheet_name, &review, submission.activity_type);

    match state.store().update_grade(key.row_id, &update).await {
        Ok(true) => {
            metrics::counter!("grade_writes_total", "source" => "manual").increment(1);
            tracing::info!(submission = %key, total = review.total_score, "Review saved");
            Ok(Json(ReviewResponse { key, review }))
        }
        Ok(false) => Err(ApiError::BadGateway(format!(
            "The store did not accept the grade for {key}; please try saving again"
        ))),
        Err(err) => {
            tracing::error!(submission = %key, error = %format!("{err:#}"), "Grade write failed");
            Err(ApiError::BadGateway(format!(
                "Could not reach the store to save {key}; please try saving again"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::models::{ReviewStatus, Room};
    use crate::repositories::submissions::SubmissionStore;
    use crate::services::auto_grade::PREVIEW_MARKER;
    use crate::test_support::{json_request, read_json, setup_test_context, submission};

    #[tokio::test]
    async fn queue_filters_sorts_and_counts_pending() {
        let ctx = setup_test_context(vec![
            submission("A", "3", Room::Room1, 2),
            submission("B", "1", Room::Room1, 3),
            submission("C", "1", Room::Room2, 4),
        ])
        .await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::GET, "/api/v1/submissions?room=Room%201&status=Pending", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["pendingCount"], 2);
        assert_eq!(body["items"][0]["name"], "B");
        assert_eq!(body["items"][1]["name"], "A");
    }

    #[tokio::test]
    async fn intake_validates_and_appends() {
        let ctx = setup_test_context(Vec::new()).await;

        let bad = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/submissions",
                Some(json!({
                    "name": "", "studentNumber": "12", "grade": "Prathom 5",
                    "room": "Room 1", "activityType": "Sports Day", "fileUrl": "https://v.example/x.mp4"
                })),
            ))
            .await
            .expect("response");
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert!(ctx.store.list().await.unwrap().is_empty());

        let ok = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/submissions",
                Some(json!({
                    "name": "Nid", "studentNumber": "12", "grade": "Prathom 6",
                    "room": "Room 4", "activityType": "Children Day", "fileUrl": "https://v.example/x.mp4"
                })),
            ))
            .await
            .expect("response");
        assert_eq!(ok.status(), StatusCode::CREATED);
        let body = read_json(ok).await;
        assert_eq!(body["sheetName"], "Children Day");
        assert_eq!(body["rowId"], 2);
        assert_eq!(ctx.store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn intake_rejects_unknown_room() {
        let ctx = setup_test_context(Vec::new()).await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/submissions",
                Some(json!({
                    "name": "Nid", "studentNumber": "12", "grade": "Prathom 6",
                    "room": "Room 9", "activityType": "Children Day", "fileUrl": "https://v.example/x.mp4"
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn auto_grade_preview_does_not_persist() {
        let ctx = setup_test_context(vec![submission("Anan", "1", Room::Room1, 2)]).await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/submissions/Sports%20Day/2/auto-grade", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert!(body["review"]["comment"].as_str().unwrap().starts_with(PREVIEW_MARKER));
        assert_eq!(body["review"]["status"], "Pending");
        assert!(ctx.store.list().await.unwrap()[0].review.is_none());
    }

    #[tokio::test]
    async fn auto_grade_preview_maps_ai_failure_to_503() {
        let ctx = setup_test_context(vec![submission("Broken", "1", Room::Room1, 2)]).await;
        ctx.scorer.fail_for("Broken");

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/submissions/Sports%20Day/2/auto-grade", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn save_review_recomputes_totals_and_marks_graded() {
        let ctx = setup_test_context(vec![submission("Anan", "1", Room::Room1, 2)]).await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/v1/submissions/Sports%20Day/2/review",
                Some(json!({
                    "contentAccuracy": 2, "participation": 1, "presentation": 1, "discipline": 1,
                    "totalScore": 19, "comment": " ดีมาก "
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["review"]["totalScore"], 5);
        assert_eq!(body["review"]["percentage"], 25);

        let stored = ctx.store.list().await.unwrap();
        let review = stored[0].review.as_ref().expect("review");
        assert_eq!(review.status, ReviewStatus::Graded);
        assert_eq!(review.comment, "ดีมาก");
        assert!(review.graded_at.is_some());
    }

    #[tokio::test]
    async fn save_review_rejects_out_of_range_and_unknown_rows() {
        let ctx = setup_test_context(vec![submission("Anan", "1", Room::Room1, 2)]).await;

        let invalid = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/v1/submissions/Sports%20Day/2/review",
                Some(json!({"contentAccuracy": 7, "participation": 1, "presentation": 1, "discipline": 1})),
            ))
            .await
            .expect("response");
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let missing = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/v1/submissions/Sports%20Day/40/review",
                Some(json!({"contentAccuracy": 1, "participation": 1, "presentation": 1, "discipline": 1})),
            ))
            .await
            .expect("response");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(ctx.store.list().await.unwrap()[0].review.is_none());
    }

    #[tokio::test]
    async fn save_review_reports_store_rejection_as_bad_gateway() {
        let ctx = setup_test_context(vec![submission("Anan", "1", Room::Room1, 2)]).await;
        ctx.store.reject_row(2);

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/v1/submissions/Sports%20Day/2/review",
                Some(json!({"contentAccuracy": 1, "participation": 1, "presentation": 1, "discipline": 1})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = read_json(response).await;
        assert_eq!(body["status"], 502);
    }
}

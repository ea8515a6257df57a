use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::submissions::load_submissions;
use crate::core::state::AppState;
use crate::schemas::grading::BatchStartResponse;
use crate::services::selection::{pending, select, SelectionCriteria};
use crate::tasks::batch::BatchSnapshot;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/batch", post(start_batch).get(batch_status))
}

/// Starts a batch over the pending items of the given criteria. Progress is read
/// back from `GET /grading/batch`.
async fn start_batch(
    State(state): State<AppState>,
    payload: Result<Json<SelectionCriteria>, JsonRejection>,
) -> Result<(StatusCode, Json<BatchStartResponse>), ApiError> {
    let Json(criteria) = payload?;
    let submissions = load_submissions(&state).await?;
    let to_grade = pending(&select(&submissions, &criteria));

    if to_grade.is_empty() {
        return Err(ApiError::NotFound("No pending submissions match the selected filters".to_string()));
    }

    let started = state
        .batches()
        .start(state.auto_grader(), to_grade)
        .map_err(|err| ApiError::Conflict(err.to_string()))?;

    let status_url = format!("{}/grading/batch", state.settings().api().api_v1_str);
    Ok((
        StatusCode::ACCEPTED,
        Json(BatchStartResponse { batch_id: started.batch_id, total: started.total, status_url }),
    ))
}

async fn batch_status(State(state): State<AppState>) -> Json<BatchSnapshot> {
    Json(state.batches().snapshot())
}

use std::time::Duration;

use axum::{
    extract::rejection::QueryRejection,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::submissions::load_submissions;
use crate::core::state::AppState;
use crate::models::{ActivityType, Grade, Room};
use crate::services::results::{find_result, ResultQuery, ResultStatus};
use crate::tasks::result_watch::ResultWatch;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AwaitQuery {
    name: String,
    grade: Grade,
    room: Room,
    activity_type: ActivityType,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(check_result)).route("/await", get(await_result))
}

fn require_name(query: &ResultQuery) -> Result<(), ApiError> {
    if query.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    Ok(())
}

async fn lookup(state: &AppState, query: &ResultQuery) -> Result<ResultStatus, ApiError> {
    let submissions = load_submissions(state).await?;
    Ok(find_result(&submissions, query))
}

async fn check_result(
    State(state): State<AppState>,
    query: Result<Query<ResultQuery>, QueryRejection>,
) -> Result<Json<ResultStatus>, ApiError> {
    let Query(query) = query?;
    require_name(&query)?;

    Ok(Json(lookup(&state, &query).await?))
}

/// Long-poll variant: holds the request while the result is awaiting review.
async fn await_result(
    State(state): State<AppState>,
    query: Result<Query<AwaitQuery>, QueryRejection>,
) -> Result<Json<ResultStatus>, ApiError> {
    let Query(raw) = query?;
    let review = state.settings().review();
    let timeout = Duration::from_secs(
        raw.timeout_seconds
            .unwrap_or(review.result_await_max_seconds)
            .min(review.result_await_max_seconds),
    );
    let query = ResultQuery {
        name: raw.name,
        grade: raw.grade,
        room: raw.room,
        activity_type: raw.activity_type,
    };
    require_name(&query)?;

    let initial = lookup(&state, &query).await?;
    if initial.is_resolved() || timeout.is_zero() {
        return Ok(Json(initial));
    }

    let every = Duration::from_secs(review.result_poll_interval_seconds);
    tracing::debug!(student = %query.name, timeout_seconds = timeout.as_secs(), "Awaiting result");
    let mut watch = ResultWatch::spawn(state.store().clone(), query, initial, every);

    let status = match tokio::time::timeout(timeout, watch.resolved()).await {
        Ok(status) => status,
        Err(_) => watch.latest(),
    };
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::models::{Review, Room};
    use crate::test_support::{json_request, read_json, setup_test_context, submission};

    const QUERY: &str = "name=%20anan&grade=Prathom%205&room=Room%201&activityType=Sports%20Day";

    #[tokio::test]
    async fn lookup_reports_each_state() {
        let mut done = submission("Malee", "2", Room::Room1, 3);
        done.review = Some(Review::default().graded_now());
        let ctx = setup_test_context(vec![submission("Anan Dee", "1", Room::Room1, 2), done]).await;

        let awaiting = ctx
            .app
            .clone()
            .oneshot(json_request(Method::GET, &format!("/api/v1/results?{QUERY}"), None))
            .await
            .expect("response");
        assert_eq!(read_json(awaiting).await["status"], "awaiting_review");

        let reviewed = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::GET,
                "/api/v1/results?name=malee&grade=Prathom%205&room=Room%201&activityType=Sports%20Day",
                None,
            ))
            .await
            .expect("response");
        let body = read_json(reviewed).await;
        assert_eq!(body["status"], "reviewed");
        assert_eq!(body["review"]["status"], "Graded");

        let missing = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::GET,
                "/api/v1/results?name=anan&grade=Prathom%206&room=Room%201&activityType=Sports%20Day",
                None,
            ))
            .await
            .expect("response");
        assert_eq!(read_json(missing).await["status"], "not_found");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let ctx = setup_test_context(Vec::new()).await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::GET,
                "/api/v1/results?name=%20&grade=Prathom%205&room=Room%201&activityType=Sports%20Day",
                None,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn await_returns_pending_status_after_timeout() {
        let ctx = setup_test_context(vec![submission("Anan", "1", Room::Room1, 2)]).await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::GET,
                &format!("/api/v1/results/await?{QUERY}&timeoutSeconds=1"),
                None,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "awaiting_review");
    }

    #[tokio::test]
    async fn await_answers_immediately_when_resolved() {
        let ctx = setup_test_context(Vec::new()).await;

        let response = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            ctx.app.clone().oneshot(json_request(
                Method::GET,
                &format!("/api/v1/results/await?{QUERY}&timeoutSeconds=60"),
                None,
            )),
        )
        .await
        .expect("no wait for unknown students")
        .expect("response");

        assert_eq!(read_json(response).await["status"], "not_found");
    }
}

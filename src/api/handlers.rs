use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};
use crate::tasks::batch::BatchState;

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let response = RootResponse {
        message: state.settings().api().project_name.clone(),
        version: state.settings().api().version.clone(),
        store_backend: state.store().backend_name().to_string(),
    };

    Json(response)
}

pub(crate) async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut components = HashMap::new();
    let backend = state.store().backend_name();

    let (code, status) = match state.store().list().await {
        Ok(rows) => {
            components.insert("store".to_string(), format!("healthy ({backend}, {} rows)", rows.len()));
            (StatusCode::OK, "healthy")
        }
        Err(err) => {
            tracing::warn!(backend, error = %err, "Store health check failed");
            components.insert("store".to_string(), format!("unhealthy: {err}"));
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let batch = match state.batches().snapshot().state {
        BatchState::Idle => "idle".to_string(),
        BatchState::Running(running) => {
            format!("running ({}/{})", running.current, running.total)
        }
    };
    components.insert("batch".to_string(), batch);

    (
        code,
        Json(HealthResponse {
            service: "activity-grader".to_string(),
            status: status.to_string(),
            components,
        }),
    )
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

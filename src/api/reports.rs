use axum::{
    extract::rejection::QueryRejection,
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::submissions::load_submissions;
use crate::core::state::AppState;
use crate::services::reports::{assemble, ReportDocument, ReportFooter, ReportMode};
use crate::services::selection::{select, ReportScope, SelectionCriteria};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:mode", get(build_report))
}

async fn build_report(
    Path(mode): Path<ReportMode>,
    State(state): State<AppState>,
    scope: Result<Query<ReportScope>, QueryRejection>,
) -> Result<Json<ReportDocument>, ApiError> {
    let Query(scope) = scope?;
    let submissions = load_submissions(&state).await?;
    let selected = select(&submissions, &SelectionCriteria::for_report(&scope));
    let footer = ReportFooter::for_today(state.settings().review());

    let document = assemble(&selected, &scope, mode, footer).map_err(|empty| {
        tracing::info!(mode = mode.as_str(), reason = %empty, "Report requested for empty selection");
        ApiError::NotFound(empty.to_string())
    })?;

    tracing::info!(mode = mode.as_str(), filename = %document.filename, rows = document.rows.len(), "Report assembled");
    Ok(Json(document))
}

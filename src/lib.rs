pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod models;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::ai_grading::AiGradingService;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let store = repositories::submissions::from_settings(&settings).await?;
    let scorer = Arc::new(AiGradingService::from_settings(&settings)?);
    let state = AppState::new(settings, store, scorer);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        store = state.store().backend_name(),
        "Activity grader API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    Ok(())
}

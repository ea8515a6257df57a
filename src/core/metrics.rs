use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!(
        "auto_grade_items_total",
        "AI scoring attempts by mode (preview/batch) and outcome"
    );
    metrics::describe_histogram!(
        "auto_grade_duration_seconds",
        "Wall time of one AI scoring call including retries"
    );
    metrics::describe_counter!("batch_runs_total", "Completed batch grading runs");
    metrics::describe_counter!("reports_generated_total", "Report documents assembled by mode");
    metrics::describe_counter!("grade_writes_total", "Grade writes to the submission store");
}

use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if PROM_HANDLE.get().is_none() {
        let handle = PrometheusBuilder::new().install_recorder()?;
        let _ = PROM_HANDLE.set(handle);
        describe();
    }
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    describe_counter!("exam_generation_requests_total", "Exam paper generation requests by status");
    describe_histogram!(
        "exam_generation_duration_seconds",
        Unit::Seconds,
        "Time spent waiting for the content generator"
    );
    describe_counter!("exam_sessions_started_total", "Sessions that entered the active phase");
    describe_counter!("exam_sessions_finished_total", "Sessions that left the active phase by outcome");
    describe_counter!("exam_integrity_violations_total", "Visibility losses recorded during active sessions");
    describe_counter!("exam_history_write_failures_total", "History appends that could not be persisted");
}

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
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_upload(kind: &'static str, size: u64) {
    metrics::counter!("uploads_total", "kind" => kind).increment(1);
    metrics::counter!("upload_bytes_total", "kind" => kind).increment(size);
}

pub(crate) fn record_enrollment_decision(decision: &'static str) {
    metrics::counter!("enrollment_decisions_total", "decision" => decision).increment(1);
}

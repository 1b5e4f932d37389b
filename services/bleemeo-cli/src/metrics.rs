//! Prometheus recorder behind `--metrics`
//!
//! The client library only emits through the `metrics` facade. Installing
//! the recorder here makes those counters visible; the rendered text is
//! printed once the command has finished.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

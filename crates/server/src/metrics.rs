//! Prometheus metrics
//!
//! Counters and gauges for session activity, recorded at the transport
//! layer so the pipeline crate stays observability-free.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder; idempotent
pub fn init_metrics() -> Option<PrometheusHandle> {
    METRICS_HANDLE
        .get_or_try_init(|| PrometheusBuilder::new().install_recorder())
        .ok()
        .cloned()
}

/// Render current metrics for the /metrics endpoint
pub async fn metrics_handler() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

pub fn record_transcript() {
    metrics::counter!("voice_assist_transcripts_total").increment(1);
}

pub fn record_reply(action: &str) {
    metrics::counter!("voice_assist_replies_total", "action" => action.to_string()).increment(1);
}

pub fn record_error(kind: &str) {
    metrics::counter!("voice_assist_errors_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_chunk(bytes: usize) {
    metrics::counter!("voice_assist_audio_chunks_total").increment(1);
    metrics::counter!("voice_assist_audio_bytes_total").increment(bytes as u64);
}

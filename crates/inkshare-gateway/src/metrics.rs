//! Prometheus metrics recording and endpoint.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus metrics recorder and return the handle for rendering.
///
/// Fails if a global recorder is already installed in this process.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {e}"))
}

/// Record a new WebSocket connection.
pub fn record_ws_connect() {
    metrics::gauge!("ws_connections_active").increment(1.0);
}

/// Record a WebSocket disconnection.
pub fn record_ws_disconnect() {
    metrics::gauge!("ws_connections_active").decrement(1.0);
}

/// Record an inbound client event.
pub fn record_event(event: &str) {
    let labels = [("event", event.to_string())];
    metrics::counter!("client_events_total", &labels).increment(1);
}

/// Record an outbound broadcast and how many connections it reached.
pub fn record_broadcast(event: &str, recipients: usize) {
    let labels = [("event", event.to_string())];
    metrics::counter!("broadcast_messages_total", &labels).increment(recipients as u64);
}

/// Record the current board size.
pub fn record_board(operations: usize, redo_depth: usize) {
    metrics::gauge!("board_operations").set(operations as f64);
    metrics::gauge!("board_redo_depth").set(redo_depth as f64);
}

/// Record a rejected frame by error code.
pub fn record_error(code: &str) {
    let labels = [("code", code.to_string())];
    metrics::counter!("rejected_frames_total", &labels).increment(1);
}

use std::net::SocketAddr;
use tracing::{info, warn};

/// Install the Prometheus exporter on `port` (overridable with `TERRITORIAL_METRICS_PORT`).
/// Counters recorded before this call are dropped; a second install is logged and ignored.
pub fn init_metrics(port: u16) {
    let port: u16 = std::env::var("TERRITORIAL_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(port);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            info!("📈 Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => {
            warn!("Prometheus exporter install failed (possibly already installed): {}", e);
        }
    }
}

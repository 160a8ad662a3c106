//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_connections_total` (counter): accepted connections
//! - `gateway_active_connections` (gauge): current connection count
//! - `gateway_requests_total` (counter): requests by route
//! - `gateway_request_duration_seconds` (histogram): time to respond, by route
//! - `gateway_bridge_messages_total` (counter): bridge events by direction
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened() {
    counter!("gateway_connections_total").increment(1);
    gauge!("gateway_active_connections").increment(1.0);
}

/// Relative update, so it commutes with concurrent opens.
pub fn record_connection_closed() {
    gauge!("gateway_active_connections").decrement(1.0);
}

pub fn record_request(route: &'static str, start: Instant) {
    counter!("gateway_requests_total", "route" => route).increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_bridge_message(direction: &'static str) {
    counter!("gateway_bridge_messages_total", "direction" => direction).increment(1);
}

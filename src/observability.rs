use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: booking attempts started.
pub const BOOKING_ATTEMPTS_TOTAL: &str = "doorstep_booking_attempts_total";

/// Counter: attempts that persisted an appointment.
pub const BOOKINGS_CONFIRMED_TOTAL: &str = "doorstep_bookings_confirmed_total";

/// Counter: attempts rejected with an error. Labels: reason.
pub const BOOKINGS_REJECTED_TOTAL: &str = "doorstep_bookings_rejected_total";

/// Counter: attempts that ended in a legitimate no-slot outcome.
pub const NO_SLOT_TOTAL: &str = "doorstep_no_slot_total";

/// Counter: attempts that ran with the route constraint failed open.
pub const ROUTE_FALLBACK_TOTAL: &str = "doorstep_route_fallback_total";

/// Counter: messages handled by the rule-based extractor because the hosted
/// one was unavailable.
pub const INTENT_FALLBACK_TOTAL: &str = "doorstep_intent_fallback_total";

/// Histogram: full attempt latency in seconds.
pub const ATTEMPT_DURATION_SECONDS: &str = "doorstep_attempt_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "doorstep_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "doorstep_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "doorstep_connections_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

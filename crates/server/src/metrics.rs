//! Prometheus metrics for the HTTP surface.
//!
//! HTTP request metrics and authentication failures live here; lifecycle,
//! gateway and audit metrics come from `ticketdesk_core::metrics` and are
//! registered into the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::error;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ticketdesk_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketdesk_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ticketdesk_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketdesk_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Engine gauges (collected dynamically)
// =============================================================================

/// Users currently inside their creation cooldown window.
pub static COOLDOWN_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ticketdesk_cooldown_entries",
        "Tracked ticket-creation cooldown records",
    )
    .unwrap()
});

/// Tickets held in the engine's memory, retained deleted ones included.
pub static TRACKED_TICKETS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ticketdesk_tracked_tickets",
        "Tickets held in memory by the lifecycle engine",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let local: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        Box::new(AUTH_FAILURES_TOTAL.clone()),
        Box::new(COOLDOWN_ENTRIES.clone()),
        Box::new(TRACKED_TICKETS.clone()),
    ];

    // Core metrics (lifecycle, gateway, audit)
    for metric in local
        .into_iter()
        .chain(ticketdesk_core::metrics::all_metrics())
    {
        if let Err(e) = registry.register(metric) {
            error!(error = %e, "Failed to register metric");
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges from current application state before encoding.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    COOLDOWN_ENTRIES.set(state.engine().cooldown().len() as i64);
    TRACKED_TICKETS.set(state.engine().tracked_tickets() as i64);
}

/// Normalize a path for metric labels (replace ticket numbers with placeholders).
pub fn normalize_path(path: &str) -> String {
    static NUMERIC: Lazy<Option<regex_lite::Regex>> =
        Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").ok());

    match NUMERIC.as_ref() {
        // Applied twice: adjacent numeric segments share a slash, so one pass
        // only rewrites every other one.
        Some(re) => {
            let once = re.replace_all(path, "/{id}$1");
            re.replace_all(&once, "/{id}$1").into_owned()
        }
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_ticket_number() {
        assert_eq!(normalize_path("/api/v1/tickets/42"), "/api/v1/tickets/{id}");
    }

    #[test]
    fn test_normalize_path_numeric_middle() {
        assert_eq!(
            normalize_path("/api/v1/tickets/42/close"),
            "/api/v1/tickets/{id}/close"
        );
    }

    #[test]
    fn test_normalize_path_adjacent_numbers() {
        assert_eq!(normalize_path("/a/1/2/3"), "/a/{id}/{id}/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("ticketdesk_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        ticketdesk_core::metrics::TICKETS_CREATED.inc();
        ticketdesk_core::metrics::GATEWAY_CALLS
            .with_label_values(&["create_container", "ok"])
            .inc();
        COOLDOWN_ENTRIES.set(0);
        TRACKED_TICKETS.set(0);

        let output = encode_metrics();

        assert!(output.contains("ticketdesk_http_request_duration_seconds"));
        assert!(output.contains("ticketdesk_http_requests_in_flight"));
        assert!(output.contains("ticketdesk_tickets_created_total"));
        assert!(output.contains("ticketdesk_gateway_calls_total"));
        assert!(output.contains("ticketdesk_cooldown_entries"));
        assert!(output.contains("ticketdesk_tracked_tickets"));
    }
}

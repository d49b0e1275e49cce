//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Ticket lifecycle (created, rejected, closed, deleted)
//! - Gateway round trips by operation and outcome
//! - Audit delivery to the notification sink

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Lifecycle
// =============================================================================

/// Tickets successfully opened.
pub static TICKETS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("ticketdesk_tickets_created_total", "Tickets opened").unwrap()
});

/// Create attempts rejected before any side effect, by reason.
pub static CREATE_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketdesk_create_rejected_total",
            "Ticket creations rejected",
        ),
        &["reason"], // "rate_limited", "already_open"
    )
    .unwrap()
});

/// Tickets closed.
pub static TICKETS_CLOSED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("ticketdesk_tickets_closed_total", "Tickets closed").unwrap()
});

/// Tickets deleted, by the state they were deleted from.
pub static TICKETS_DELETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketdesk_tickets_deleted_total", "Tickets deleted"),
        &["from_state"],
    )
    .unwrap()
});

/// Close/delete attempts by actors without the staff role.
pub static FORBIDDEN_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketdesk_forbidden_attempts_total",
            "Lifecycle operations refused for lack of staff role",
        ),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Gateway
// =============================================================================

/// Gateway calls by operation and result.
pub static GATEWAY_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketdesk_gateway_calls_total", "Chat platform API calls"),
        &["operation", "result"],
    )
    .unwrap()
});

/// Gateway call latency.
pub static GATEWAY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ticketdesk_gateway_duration_seconds",
            "Chat platform API call duration",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Audit
// =============================================================================

/// Audit events by delivery outcome ("delivered", "failed").
pub static AUDIT_DELIVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketdesk_audit_deliveries_total",
            "Audit events by delivery outcome",
        ),
        &["result"],
    )
    .unwrap()
});

/// All core metrics, for registration by the server.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TICKETS_CREATED.clone()),
        Box::new(CREATE_REJECTED.clone()),
        Box::new(TICKETS_CLOSED.clone()),
        Box::new(TICKETS_DELETED.clone()),
        Box::new(FORBIDDEN_ATTEMPTS.clone()),
        Box::new(GATEWAY_CALLS.clone()),
        Box::new(GATEWAY_DURATION.clone()),
        Box::new(AUDIT_DELIVERIES.clone()),
    ]
}

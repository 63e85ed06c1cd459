use std::net::SocketAddr;

use crate::protocol::Request;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total protocol requests handled. Labels: op, status.
pub const REQUESTS_TOTAL: &str = "courtside_requests_total";

/// Histogram: request latency in seconds. Labels: op.
pub const REQUEST_DURATION_SECONDS: &str = "courtside_request_duration_seconds";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: conflict checks run against stored state. Labels: outcome (conflict|clear).
pub const CONFLICT_CHECKS_TOTAL: &str = "courtside_conflict_checks_total";

/// Counter: workflow transitions recorded. Labels: status (approved|declined|reopened).
pub const TRANSITIONS_TOTAL: &str = "courtside_transitions_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: open client connections.
pub const CONNECTIONS_ACTIVE: &str = "courtside_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "courtside_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "courtside_connections_rejected_total";

/// Counter: rejected admin tokens.
pub const AUTH_FAILURES_TOTAL: &str = "courtside_auth_failures_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "courtside_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "courtside_wal_flush_batch_size";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a request to a short label for metrics.
pub fn op_label(req: &Request) -> &'static str {
    match req {
        Request::CheckConflicts { .. } => "check_conflicts",
        Request::Availability { .. } => "availability",
        Request::Submit { .. } => "submit",
        Request::Amend { .. } => "amend",
        Request::Authenticate { .. } => "authenticate",
        Request::Get { .. } => "get",
        Request::List { .. } => "list",
        Request::Transition { .. } => "transition",
        Request::Reopen { .. } => "reopen",
    }
}

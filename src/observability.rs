use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total statements executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "slotfinder_queries_total";

/// Histogram: statement latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "slotfinder_query_duration_seconds";

/// Counter: availability computations. Labels: strategy.
pub const AVAILABILITY_COMPUTATIONS_TOTAL: &str = "slotfinder_availability_computations_total";

/// Histogram: entries returned per availability computation. Labels: strategy.
pub const AVAILABILITY_ENTRIES: &str = "slotfinder_availability_entries";

/// Histogram: availability computation time in seconds. Labels: strategy.
pub const AVAILABILITY_DURATION_SECONDS: &str = "slotfinder_availability_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "slotfinder_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "slotfinder_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "slotfinder_connections_rejected_total";

/// Gauge: number of open tenant stores.
pub const TENANTS_ACTIVE: &str = "slotfinder_tenants_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertSalesManager(_) => "insert_sales_manager",
        Command::InsertSlots { .. } => "insert_slots",
        Command::DeleteSlot { .. } => "delete_slot",
        Command::DeleteSalesManager { .. } => "delete_sales_manager",
        Command::SelectAvailability { .. } => "select_availability",
        Command::SelectSalesManagers => "select_sales_managers",
        Command::SelectSlots { .. } => "select_slots",
        Command::SelectHealth => "select_health",
    }
}

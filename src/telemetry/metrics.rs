//! Prometheus exporter setup

use crate::config::TelemetryConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Start the Prometheus scrape endpoint and describe the gauges and
/// counters the decision path emits.
pub fn init_metrics(config: &TelemetryConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    ::metrics::describe_counter!(
        "guardian_decisions_total",
        "Decisions produced, labelled by action"
    );
    ::metrics::describe_counter!(
        "guardian_decisions_published_total",
        "Decisions handed to the fan-out boundary"
    );
    ::metrics::describe_counter!(
        "guardian_outcomes_total",
        "Settled trade outcomes, labelled by result"
    );
    ::metrics::describe_counter!(
        "guardian_readings_total",
        "Signal readings consumed, labelled by disposition"
    );
    ::metrics::describe_counter!(
        "guardian_emergency_stops_total",
        "Auto-stops latched by compliance violations"
    );
    ::metrics::describe_gauge!("guardian_subscribers", "Live broadcast subscribers");
    ::metrics::describe_gauge!("guardian_account_balance", "Current account balance");
    ::metrics::describe_gauge!(
        "guardian_consecutive_failures",
        "Current consecutive-failure streak"
    );

    tracing::info!(%addr, "Metrics endpoint listening");
    Ok(())
}

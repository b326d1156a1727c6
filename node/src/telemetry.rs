// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "vigil_node=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let builder = PrometheusBuilder::new();
    builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    metrics::describe_counter!(
        "vigil_events_drained_total",
        "Total number of audit events drained from shard inboxes"
    );
    metrics::describe_counter!(
        "vigil_completions_total",
        "Total number of storage operations reconciled to a completion verdict"
    );
    metrics::describe_counter!(
        "vigil_completion_mismatches_total",
        "Completions where the metadata and data sides disagreed"
    );
    metrics::describe_counter!(
        "vigil_records_evicted_total",
        "Total number of correlation records evicted by retention"
    );
    metrics::describe_gauge!(
        "vigil_snapshot_size_bytes",
        "Size of the last persisted shard state file in bytes"
    );

    // Ensure at least one metric exists on startup
    metrics::gauge!("vigil_node_up", 1.0);
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use vigil_kernel::{AuditConfig, Auditor, Dispatcher, ShardRouting};

use vigil_node::flusher::spawn_flusher;
use vigil_node::lifecycle::{on_shutdown, on_startup};
use vigil_node::listener::MismatchLogger;
use vigil_node::shard::{spawn_cleanup, spawn_drain};
use vigil_node::telemetry::init_telemetry;
use vigil_node::transport::channel_transport;

#[tokio::main]
async fn main() {
    init_telemetry();

    let cfg = AuditConfig::from_env();
    tracing::info!("Initializing Vigil Node with config: {:?}", cfg);

    let routing = ShardRouting::from_config(&cfg);
    let (transport, inboxes) = channel_transport(&routing);

    let auditors: Vec<Arc<Auditor>> = (0..routing.shard_count())
        .map(|shard_id| Arc::new(Auditor::new(shard_id, &cfg, Box::new(MismatchLogger))))
        .collect();

    on_startup(&auditors);

    let mut drains = Vec::with_capacity(inboxes.len());
    for inbox in inboxes {
        let auditor = auditors[inbox.shard_id].clone();
        drains.push(spawn_drain(inbox, auditor));
    }
    let cleanup = spawn_cleanup(auditors.clone());

    let dispatcher = Arc::new(Dispatcher::new(&cfg, routing, Box::new(transport)));
    let flusher = spawn_flusher(&cfg, dispatcher.clone());

    tracing::info!("Vigil node running. Ctrl-C to stop.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
    }

    tracing::info!("Shutting down...");
    flusher.abort();
    cleanup.abort();
    let _ = flusher.await;
    let _ = cleanup.await;

    // Dropping the dispatcher closes the shard channels, so the drain
    // tasks finish whatever was already sent before persist runs.
    dispatcher.flush();
    drop(dispatcher);
    for drain in drains {
        let _ = drain.await;
    }

    on_shutdown(&auditors);
}

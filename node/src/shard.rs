// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-shard runtime tasks.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use vigil_kernel::record::now_ms;
use vigil_kernel::Auditor;

use crate::transport::ShardInbox;

/// Retention pass schedule, matching the engine's windows being measured
/// in minutes.
pub const CLEANUP_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Drain one shard's inbox into its reconciliation engine. The task runs
/// until the transport side of the channel is dropped.
pub fn spawn_drain(inbox: ShardInbox, auditor: Arc<Auditor>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ShardInbox {
            shard_id,
            destination,
            mut receiver,
        } = inbox;
        tracing::info!(shard_id, destination = %destination, "shard drain task started");
        while let Some(event) = receiver.recv().await {
            metrics::increment_counter!("vigil_events_drained_total");
            auditor.process_event(&event);
        }
        tracing::info!(shard_id, "shard drain task stopped, channel closed");
    })
}

/// Periodically evict expired correlation records from every shard.
pub fn spawn_cleanup(auditors: Vec<Arc<Auditor>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(CLEANUP_PERIOD);
        // First tick fires immediately; skip it so a fresh process does
        // not run a retention pass on an empty map.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let now = now_ms();
            for auditor in &auditors {
                let evicted = auditor.cleanup(now);
                if evicted > 0 {
                    metrics::counter!("vigil_records_evicted_total", evicted as u64);
                }
            }
        }
    })
}

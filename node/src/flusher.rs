// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Batch emission timer.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};

use vigil_kernel::config::FLUSH_INITIAL_DELAY_MS;
use vigil_kernel::{AuditConfig, Dispatcher};

/// Drain the dispatcher's pending buffer on a fixed period. The initial
/// delay gives producers a beat to register before the first flush.
pub fn spawn_flusher(cfg: &AuditConfig, dispatcher: Arc<Dispatcher>) -> JoinHandle<()> {
    let period = cfg.flush_period();
    tokio::spawn(async move {
        sleep(Duration::from_millis(FLUSH_INITIAL_DELAY_MS)).await;
        tracing::info!(period_ms = period.as_millis() as u64, "flush timer started");
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            dispatcher.flush();
        }
    })
}

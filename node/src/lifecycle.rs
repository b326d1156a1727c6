// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Process lifecycle hooks around the kernel's persistence.

use std::sync::Arc;

use vigil_kernel::Auditor;

/// Restore every shard's persisted state. Safe to call more than once;
/// the engine itself is idempotent about it.
pub fn on_startup(auditors: &[Arc<Auditor>]) {
    let mut restored = 0usize;
    for auditor in auditors {
        restored += auditor.restore();
    }
    tracing::info!(restored, "startup restore finished");
}

/// Persist every shard's in-flight map before the process exits.
pub fn on_shutdown(auditors: &[Arc<Auditor>]) {
    for auditor in auditors {
        let bytes = auditor.persist();
        if bytes > 0 {
            metrics::gauge!("vigil_snapshot_size_bytes", bytes as f64);
        }
    }
    tracing::info!("shutdown persist finished");
}

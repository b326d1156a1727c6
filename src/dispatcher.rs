// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Sharding dispatcher.
//!
//! Splits an incoming [`AuditEvent`] into at most N sub-events, one per
//! engine shard, by a stable hash of each trace id, and hands every
//! non-empty sub-event to the injected transport. A send failure for one
//! shard is logged and never blocks the remaining shards.
//!
//! Also owns the pending-event buffer that the batch flush timer drains:
//! local producers call [`Dispatcher::buffer`] at arbitrary frequency and
//! a single periodic [`Dispatcher::flush`] coalesces everything gathered
//! since the last tick into one `submit`.

use std::sync::Mutex;

use crate::config::AuditConfig;
use crate::error::TransportError;
use crate::event::AuditEvent;
use crate::types::id::TraceId;

/// Narrow transport seam. Implementations move one serialized sub-event
/// to one named shard destination; delivery is assumed at-least-once,
/// unordered, and possibly duplicated.
pub trait EventSender: Send + Sync {
    fn send(&self, event: &AuditEvent, destination: &str) -> Result<(), TransportError>;
}

/// FNV-1a 64 fold over the trace id bytes. Self-contained so the
/// trace-id to shard mapping is identical in every process and stable
/// across toolchain versions.
pub fn stable_hash(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Pure trace-id to shard mapping plus the per-shard destination names,
/// computed once at startup and shared by reference.
#[derive(Clone, Debug)]
pub struct ShardRouting {
    shard_count: usize,
    destinations: Vec<String>,
}

impl ShardRouting {
    pub fn new(shard_count: usize, queue_root: &str) -> Self {
        let shard_count = shard_count.max(1);
        let destinations = (1..=shard_count)
            .map(|i| format!("{queue_root}{i}"))
            .collect();
        ShardRouting {
            shard_count,
            destinations,
        }
    }

    pub fn from_config(cfg: &AuditConfig) -> Self {
        ShardRouting::new(cfg.shard_count, &cfg.queue_root)
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Deterministic shard assignment: `stable_hash(trace_id) mod N`.
    pub fn shard_for(&self, trace_id: &TraceId) -> usize {
        (stable_hash(trace_id.as_str()) % self.shard_count as u64) as usize
    }

    pub fn destination(&self, shard: usize) -> &str {
        &self.destinations[shard]
    }
}

pub struct Dispatcher {
    enabled: bool,
    routing: ShardRouting,
    sender: Box<dyn EventSender>,
    pending: Mutex<AuditEvent>,
}

impl Dispatcher {
    pub fn new(cfg: &AuditConfig, routing: ShardRouting, sender: Box<dyn EventSender>) -> Self {
        let enabled = cfg.auditing_enabled();
        tracing::info!(
            shards = routing.shard_count(),
            "audit dispatcher {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Dispatcher {
            enabled,
            routing,
            sender,
            pending: Mutex::new(AuditEvent::default()),
        }
    }

    pub fn routing(&self) -> &ShardRouting {
        &self.routing
    }

    /// Split the event by trace-id shard and send each non-empty
    /// sub-event to its destination. Fire-and-forget for the caller;
    /// sequential and isolated per shard. When disabled this returns
    /// before any partitioning work.
    pub fn submit(&self, event: AuditEvent) {
        if !self.enabled || event.is_empty() {
            return;
        }
        for (shard, sub_event) in self.split(event) {
            let destination = self.routing.destination(shard);
            if let Err(e) = self.sender.send(&sub_event, destination) {
                tracing::error!(
                    destination,
                    error = %e,
                    event = ?sub_event,
                    "error sending audit event"
                );
            }
        }
    }

    /// Submit an event carrying only identity associations.
    pub fn submit_associations(&self, associations: Vec<crate::types::id::IdentityAssociation>) {
        if !associations.is_empty() {
            self.submit(AuditEvent::with_associations(associations));
        }
    }

    /// Submit an event carrying only metadata outcomes.
    pub fn submit_metadata_outcomes(
        &self,
        outcomes: std::collections::HashMap<crate::types::enums::MetadataOutcome, Vec<TraceId>>,
    ) {
        if !outcomes.is_empty() {
            self.submit(AuditEvent::with_metadata_outcomes(outcomes));
        }
    }

    /// Submit an event carrying only data outcomes.
    pub fn submit_data_outcomes(
        &self,
        outcomes: std::collections::HashMap<crate::types::enums::DataOutcome, Vec<TraceId>>,
    ) {
        if !outcomes.is_empty() {
            self.submit(AuditEvent::with_data_outcomes(outcomes));
        }
    }

    /// Merge an event into the pending buffer without sending anything.
    pub fn buffer(&self, event: AuditEvent) {
        if !self.enabled || event.is_empty() {
            return;
        }
        self.lock_pending().merge(event);
    }

    /// Take and submit whatever the buffer gathered since the last tick.
    pub fn flush(&self) {
        if !self.enabled {
            return;
        }
        let pending = core::mem::take(&mut *self.lock_pending());
        if !pending.is_empty() {
            self.submit(pending);
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, AuditEvent> {
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn split(&self, event: AuditEvent) -> Vec<(usize, AuditEvent)> {
        let n = self.routing.shard_count();
        let mut sub_events: Vec<AuditEvent> = vec![AuditEvent::default(); n];

        for association in event.associations {
            let shard = self.routing.shard_for(&association.trace_id);
            sub_events[shard].associations.push(association);
        }
        for (outcome, trace_ids) in event.metadata_outcomes {
            for trace_id in trace_ids {
                let shard = self.routing.shard_for(&trace_id);
                sub_events[shard]
                    .metadata_outcomes
                    .entry(outcome)
                    .or_default()
                    .push(trace_id);
            }
        }
        for (outcome, trace_ids) in event.data_outcomes {
            for trace_id in trace_ids {
                let shard = self.routing.shard_for(&trace_id);
                sub_events[shard]
                    .data_outcomes
                    .entry(outcome)
                    .or_default()
                    .push(trace_id);
            }
        }

        sub_events
            .into_iter()
            .enumerate()
            .filter(|(_, sub_event)| !sub_event.is_empty())
            .collect()
    }
}

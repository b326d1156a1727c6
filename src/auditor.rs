// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-shard reconciliation engine.
//!
//! One `Auditor` owns the in-flight map for one shard of trace-id space.
//! It merges partial reports into correlation records, fires the
//! completion listener when a record becomes fully accounted for, evicts
//! expired records on a retention policy, and persists surviving records
//! across restarts.
//!
//! # Locking
//! Every mutating operation holds the shard's single map lock for its
//! whole duration, including the completion check and listener call, so
//! completion detection is race-free and at most one mutation is in
//! flight per shard. The listener must therefore not block.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{AuditConfig, BenignTransition};
use crate::event::AuditEvent;
use crate::record::{now_ms, CorrelationRecord};
use crate::snapshot;
use crate::types::enums::{DataOutcome, MetadataOutcome};
use crate::types::id::{IdentityAssociation, MetadataSpecificity, TraceId};

type RecordMap = HashMap<TraceId, CorrelationRecord>;

/// Callback invoked from inside the engine's locked mutation path each
/// time a record newly completes or a complete record's outcome changes
/// value. Receives a read-only view of the whole in-flight map for
/// cross-record diagnostics. Must not mutate engine state and must not
/// block.
pub trait CompletionListener: Send + Sync {
    fn on_complete(&self, record: &CorrelationRecord, in_flight: &RecordMap);
}

pub struct Auditor {
    shard_id: usize,
    enabled: bool,
    records: Mutex<RecordMap>,
    listener: Box<dyn CompletionListener>,
    completed_retention_ms: u64,
    pending_retention_ms: u64,
    benign_transitions: Vec<BenignTransition>,
    state_dir: PathBuf,
    restored: AtomicBool,
}

impl Auditor {
    pub fn new(shard_id: usize, cfg: &AuditConfig, listener: Box<dyn CompletionListener>) -> Self {
        let enabled = cfg.auditing_enabled();
        tracing::info!(
            shard_id,
            "storage auditor {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Auditor {
            shard_id,
            enabled,
            records: Mutex::new(HashMap::new()),
            listener,
            completed_retention_ms: cfg.completed_retention().as_millis() as u64,
            pending_retention_ms: cfg.pending_retention().as_millis() as u64,
            benign_transitions: cfg.benign_transitions.clone(),
            state_dir: cfg.state_dir.clone(),
            restored: AtomicBool::new(false),
        }
    }

    pub fn shard_id(&self) -> usize {
        self.shard_id
    }

    /// Apply every report shape carried by one inbound event under a
    /// single lock acquisition.
    pub fn process_event(&self, event: &AuditEvent) {
        if !self.enabled {
            return;
        }
        let mut records = self.lock_records();
        if !event.associations.is_empty() {
            self.apply_associations_locked(&mut records, &event.associations);
        }
        if !event.metadata_outcomes.is_empty() {
            self.apply_metadata_locked(&mut records, &event.metadata_outcomes);
        }
        if !event.data_outcomes.is_empty() {
            self.apply_data_locked(&mut records, &event.data_outcomes);
        }
    }

    pub fn apply_identity_associations(&self, associations: &[IdentityAssociation]) {
        if !self.enabled || associations.is_empty() {
            return;
        }
        let mut records = self.lock_records();
        self.apply_associations_locked(&mut records, associations);
    }

    pub fn apply_metadata_outcomes(&self, outcomes: &HashMap<MetadataOutcome, Vec<TraceId>>) {
        if !self.enabled || outcomes.is_empty() {
            return;
        }
        let mut records = self.lock_records();
        self.apply_metadata_locked(&mut records, outcomes);
    }

    pub fn apply_data_outcomes(&self, outcomes: &HashMap<DataOutcome, Vec<TraceId>>) {
        if !self.enabled || outcomes.is_empty() {
            return;
        }
        let mut records = self.lock_records();
        self.apply_data_locked(&mut records, outcomes);
    }

    fn apply_associations_locked(
        &self,
        records: &mut RecordMap,
        associations: &[IdentityAssociation],
    ) {
        tracing::debug!(count = associations.len(), "processing identity associations");
        let now = now_ms();
        for association in associations {
            let record = records
                .entry(association.trace_id.clone())
                .or_insert_with(|| CorrelationRecord::new(association.trace_id.clone(), now));
            if record.meta_id.is_some() || record.data_id.is_some() {
                // Duplicate association report. Identities are never
                // overwritten.
                tracing::error!(
                    record = ?record,
                    new = ?association,
                    "identity already set on correlation record"
                );
                continue;
            }
            let was_complete = record.is_complete();
            record.meta_id = Some(association.meta.clone());
            record.data_id = Some(association.data.clone());
            if association.meta.specificity == MetadataSpecificity::NoMetadata {
                if record.metadata_outcome.is_some() {
                    tracing::error!(
                        record = ?record,
                        "metadata outcome reported for operation that should have no metadata"
                    );
                } else {
                    record.metadata_outcome = Some(MetadataOutcome::NotApplicable);
                }
            }
            if record.is_complete() && !was_complete {
                tracing::debug!(trace_id = %record.trace_id, "storage operation completed");
                let completed = record.clone();
                self.listener.on_complete(&completed, records);
            }
        }
    }

    fn apply_metadata_locked(
        &self,
        records: &mut RecordMap,
        outcomes: &HashMap<MetadataOutcome, Vec<TraceId>>,
    ) {
        tracing::debug!(outcomes = ?outcomes, "processing metadata outcomes");
        let now = now_ms();
        for (outcome, trace_ids) in outcomes {
            for trace_id in trace_ids {
                let record = records
                    .entry(trace_id.clone())
                    .or_insert_with(|| CorrelationRecord::new(trace_id.clone(), now));
                let previous = record.metadata_outcome;
                record.metadata_outcome = Some(*outcome);
                if record.is_complete() {
                    match previous {
                        None => {
                            tracing::debug!(record = ?record, "storage operation completed");
                        }
                        Some(prev) if prev == *outcome => {
                            // Redelivered report; nothing changed.
                            tracing::debug!(
                                record = ?record,
                                "metadata outcome re-reported unchanged"
                            );
                        }
                        Some(prev) => {
                            // Metadata outcomes should arrive exactly once.
                            if self.is_benign_transition(record.data_outcome, prev, *outcome) {
                                tracing::info!(
                                    previous = ?prev,
                                    record = ?record,
                                    "metadata outcome updated (known benign sequence)"
                                );
                            } else {
                                tracing::warn!(
                                    previous = ?prev,
                                    record = ?record,
                                    "metadata outcome updated"
                                );
                            }
                        }
                    }
                    if previous != Some(*outcome) {
                        let completed = record.clone();
                        self.listener.on_complete(&completed, records);
                    }
                }
            }
        }
    }

    fn apply_data_locked(
        &self,
        records: &mut RecordMap,
        outcomes: &HashMap<DataOutcome, Vec<TraceId>>,
    ) {
        tracing::debug!(outcomes = ?outcomes, "processing data outcomes");
        let now = now_ms();
        for (outcome, trace_ids) in outcomes {
            for trace_id in trace_ids {
                let record = records
                    .entry(trace_id.clone())
                    .or_insert_with(|| CorrelationRecord::new(trace_id.clone(), now));
                let previous = record.data_outcome;
                record.data_outcome = Some(*outcome);
                match outcome {
                    DataOutcome::FailureSync => {
                        // The pipeline short-circuits metadata storage on a
                        // synchronous data failure; no metadata report will
                        // ever arrive.
                        if record.metadata_outcome.is_none() {
                            record.metadata_outcome =
                                Some(MetadataOutcome::StorageNotReachedForFailure);
                        } else {
                            tracing::warn!(
                                record = ?record,
                                "metadata outcome present despite synchronous data failure"
                            );
                        }
                    }
                    DataOutcome::DuplicateSync => {
                        if record.metadata_outcome.is_none() {
                            record.metadata_outcome =
                                Some(MetadataOutcome::StorageNotReachedForDuplicate);
                        } else {
                            tracing::warn!(
                                record = ?record,
                                "metadata outcome present despite synchronous duplicate data"
                            );
                        }
                    }
                    _ => {}
                }
                if record.is_complete() {
                    match previous {
                        None => {
                            tracing::debug!(record = ?record, "storage operation completed");
                        }
                        Some(prev) => {
                            // Common: re-storing a group replays every entry
                            // already in it with a replace store op.
                            tracing::debug!(
                                previous = ?prev,
                                record = ?record,
                                "data outcome updated"
                            );
                        }
                    }
                    if previous != Some(*outcome) {
                        let completed = record.clone();
                        self.listener.on_complete(&completed, records);
                    }
                }
            }
        }
    }

    fn is_benign_transition(
        &self,
        data_outcome: Option<DataOutcome>,
        from: MetadataOutcome,
        to: MetadataOutcome,
    ) -> bool {
        data_outcome.is_some_and(|data| {
            self.benign_transitions
                .iter()
                .any(|t| t.data_outcome == data && t.from == from && t.to == to)
        })
    }

    /// Evict expired records. Complete records older than the completed
    /// retention window are dropped silently; incomplete records older
    /// than the pending window are dropped with an anomaly log, unless
    /// they only ever carried a data outcome (benign, see
    /// [`CorrelationRecord::has_data_outcome_only`]). Returns the number
    /// of evicted records. Runs on a fixed schedule.
    pub fn cleanup(&self, now_ms: u64) -> usize {
        if !self.enabled {
            return 0;
        }
        let completed_cutoff = now_ms.saturating_sub(self.completed_retention_ms);
        let pending_cutoff = now_ms.saturating_sub(self.pending_retention_ms);

        let mut records = self.lock_records();
        let total = records.len();
        tracing::info!(
            shard_id = self.shard_id,
            total,
            "cleaning up expired correlation records"
        );
        let mut evicted = 0usize;
        records.retain(|_, record| {
            if record.is_complete() {
                if record.start_time_ms < completed_cutoff {
                    evicted += 1;
                    return false;
                }
            } else if record.start_time_ms < pending_cutoff {
                if record.has_data_outcome_only() {
                    tracing::info!(
                        record = ?record,
                        "expired correlation record only has a data outcome"
                    );
                } else {
                    tracing::warn!(
                        record = ?record,
                        "expired correlation record never completed"
                    );
                }
                evicted += 1;
                return false;
            }
            true
        });
        tracing::info!(
            shard_id = self.shard_id,
            retained = records.len(),
            evicted,
            "retention pass finished"
        );
        evicted
    }

    /// Load persisted state from this shard's state file, merge it into
    /// the in-flight map without overwriting records that arrived since
    /// startup, and delete the file so a later crash starts empty.
    /// Idempotent: startup hooks may fire more than once, only the first
    /// call does anything. Returns the number of records merged.
    pub fn restore(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        if self.restored.swap(true, Ordering::SeqCst) {
            return 0;
        }

        let path = snapshot::state_file_path(&self.state_dir, self.shard_id);
        if !path.is_file() {
            if path.exists() {
                tracing::error!(path = ?path, "persisted state is not a regular file");
            } else {
                tracing::info!(shard_id = self.shard_id, "no persisted state to load");
            }
            return 0;
        }

        let mut merged = 0usize;
        match snapshot::load_file(&path) {
            Ok(loaded) => {
                let mut records = self.lock_records();
                for (trace_id, record) in loaded {
                    records.entry(trace_id).or_insert_with(|| {
                        merged += 1;
                        record
                    });
                }
                tracing::info!(
                    shard_id = self.shard_id,
                    merged,
                    "loaded persisted correlation records"
                );
            }
            Err(e) => {
                // Start empty; prior state is best-effort.
                tracing::error!(path = ?path, error = %e, "error loading persisted state");
            }
        }
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::error!(path = ?path, error = %e, "error deleting persisted state");
        }
        merged
    }

    /// Persist the in-flight map to this shard's state file at graceful
    /// shutdown. Skipped when the map is empty so a process that never
    /// ran the engine cannot clobber a previously saved file. Runs a
    /// retention pass first. Returns the number of bytes written.
    pub fn persist(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        if self.lock_records().is_empty() {
            return 0;
        }

        self.cleanup(now_ms());

        let records = self.lock_records();
        let path = snapshot::state_file_path(&self.state_dir, self.shard_id);
        tracing::info!(
            shard_id = self.shard_id,
            count = records.len(),
            path = ?path,
            "persisting correlation records"
        );
        match snapshot::save_file(&path, &records) {
            Ok(bytes) => bytes,
            Err(e) => {
                // In-flight state for this shard is lost across the
                // restart; retried upstream operations re-derive it.
                tracing::error!(path = ?path, error = %e, "error persisting state");
                0
            }
        }
    }

    /// Clone of the current in-flight map, for diagnostics and tests.
    pub fn snapshot_records(&self) -> RecordMap {
        self.lock_records().clone()
    }

    pub fn in_flight_len(&self) -> usize {
        self.lock_records().len()
    }

    fn lock_records(&self) -> MutexGuard<'_, RecordMap> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

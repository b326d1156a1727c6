// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Audit subsystem configuration.
//!
//! Plain struct with defaults, populated from the environment by the
//! hosting process. The shard count must be identical on the dispatcher
//! and the engine deployment; changing it invalidates the trace-id to
//! shard mapping for any persisted in-flight state.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::enums::{DataOutcome, MetadataOutcome};

/// Backend providers whose data store acknowledges writes before metadata
/// is durably reconciled. Auditing only pays off for these.
pub const WRITE_BEHIND_PROVIDERS: &[&str] = &["ignite"];

/// Default and floor for the batch flush period. The floor keeps a zero
/// or negative configuration from turning the flush timer into a busy
/// loop.
pub const DEFAULT_FLUSH_PERIOD_MS: u64 = 5000;
pub const MIN_FLUSH_PERIOD_MS: u64 = 100;

/// Delay before the first batch flush tick.
pub const FLUSH_INITIAL_DELAY_MS: u64 = 1000;

/// A metadata-outcome transition that is known to be legitimate for some
/// producer despite arriving after a previous outcome was already
/// recorded. Matching transitions are logged at info instead of warn.
#[derive(Clone, Debug, PartialEq)]
pub struct BenignTransition {
    /// Data outcome already on the record.
    pub data_outcome: DataOutcome,
    /// Previously recorded metadata outcome.
    pub from: MetadataOutcome,
    /// Newly reported metadata outcome.
    pub to: MetadataOutcome,
}

#[derive(Clone, Debug)]
pub struct AuditConfig {
    /// Backend data store provider identifier.
    pub provider: String,
    /// Explicit on/off switch for the whole subsystem.
    pub enabled: bool,
    /// Number of independent engine shards.
    pub shard_count: usize,
    /// Root of the per-shard destination names; shard k listens on
    /// `<queue_root><k+1>`.
    pub queue_root: String,
    /// How long a completed record stays in memory, minutes.
    pub completed_retention_mins: u64,
    /// How long an incomplete record stays in memory, minutes. Longer
    /// than the completed window since late reports may still arrive.
    pub pending_retention_mins: u64,
    /// Batch flush period, millis. Floored by `MIN_FLUSH_PERIOD_MS`.
    pub flush_period_ms: u64,
    /// Shared-storage directory for per-shard persisted state files.
    pub state_dir: PathBuf,
    /// Metadata-outcome transitions recognized as benign.
    pub benign_transitions: Vec<BenignTransition>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            provider: "ignite".to_owned(),
            enabled: true,
            shard_count: 4,
            queue_root: "audit.event.".to_owned(),
            completed_retention_mins: 60,
            pending_retention_mins: 4320,
            flush_period_ms: DEFAULT_FLUSH_PERIOD_MS,
            state_dir: PathBuf::from("vigil_state"),
            benign_transitions: vec![BenignTransition {
                data_outcome: DataOutcome::DuplicateSync,
                from: MetadataOutcome::StorageNotReachedForDuplicate,
                to: MetadataOutcome::Duplicate,
            }],
        }
    }
}

impl AuditConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = AuditConfig::default();
        AuditConfig {
            provider: env_str("DATASTORE_PROVIDER").unwrap_or(defaults.provider),
            enabled: env_str("AUDITOR_ENABLED")
                .map(|v| v == "true")
                .unwrap_or(false),
            shard_count: env_parse("AUDITOR_SHARDS").unwrap_or(defaults.shard_count),
            queue_root: env_str("AUDIT_QUEUE_ROOT").unwrap_or(defaults.queue_root),
            completed_retention_mins: env_parse("AUDIT_COMPLETED_RETENTION_MINS")
                .unwrap_or(defaults.completed_retention_mins),
            pending_retention_mins: env_parse("AUDIT_PENDING_RETENTION_MINS")
                .unwrap_or(defaults.pending_retention_mins),
            flush_period_ms: env_parse::<i64>("AUDIT_FLUSH_PERIOD_MS")
                .filter(|ms| *ms > 0)
                .map(|ms| ms as u64)
                .unwrap_or(defaults.flush_period_ms),
            state_dir: env_str("AUDIT_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            benign_transitions: defaults.benign_transitions,
        }
    }

    /// The subsystem runs only when the provider needs it and the switch
    /// is on. Synchronous-consistency backends never pay correlation
    /// cost.
    pub fn auditing_enabled(&self) -> bool {
        WRITE_BEHIND_PROVIDERS.contains(&self.provider.as_str()) && self.enabled
    }

    /// Batch flush period with the busy-loop floor applied.
    pub fn flush_period(&self) -> Duration {
        Duration::from_millis(self.flush_period_ms.max(MIN_FLUSH_PERIOD_MS))
    }

    pub fn completed_retention(&self) -> Duration {
        Duration::from_secs(self.completed_retention_mins * 60)
    }

    pub fn pending_retention(&self) -> Duration {
        Duration::from_secs(self.pending_retention_mins * 60)
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: core::str::FromStr>(key: &str) -> Option<T> {
    env_str(key).and_then(|v| v.parse().ok())
}

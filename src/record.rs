// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-operation correlation record.

use serde::{Deserialize, Serialize};

use crate::types::enums::{DataOutcome, MetadataOutcome};
use crate::types::id::{DataIdentity, MetadataIdentity, TraceId};

/// Accumulated state for one trace id across identity, metadata, and data
/// reports. Created lazily on first report, mutated in place, evicted by
/// the retention pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub trace_id: TraceId,
    pub meta_id: Option<MetadataIdentity>,
    pub data_id: Option<DataIdentity>,
    pub metadata_outcome: Option<MetadataOutcome>,
    pub data_outcome: Option<DataOutcome>,
    /// First-touch time, unix millis. Drives retention aging.
    pub start_time_ms: u64,
}

impl CorrelationRecord {
    pub fn new(trace_id: TraceId, start_time_ms: u64) -> Self {
        CorrelationRecord {
            trace_id,
            meta_id: None,
            data_id: None,
            metadata_outcome: None,
            data_outcome: None,
            start_time_ms,
        }
    }

    /// A record is complete once both sides have reported an outcome.
    /// Complete means fully accounted for, not succeeded: failures are
    /// outcome values on an otherwise complete record. Identities are set
    /// atomically as a pair, so no separate consistency term is needed.
    pub fn is_complete(&self) -> bool {
        self.metadata_outcome.is_some() && self.data_outcome.is_some()
    }

    /// True when the record carries a data outcome and nothing else.
    /// An expired record in this state is benign: a completed operation
    /// aged out here while its trace id lingered in the data store's
    /// cache and got re-reported on a later store of the same group.
    pub fn has_data_outcome_only(&self) -> bool {
        self.data_outcome.is_some()
            && self.metadata_outcome.is_none()
            && self.meta_id.is_none()
            && self.data_id.is_none()
    }
}

/// Current wall-clock time in unix millis.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Audit event container.
//!
//! One `AuditEvent` carries any mix of the three report shapes produced by
//! the write pipeline: identity associations, metadata outcomes, and data
//! outcomes. Outcome maps are compactly keyed by outcome value, with many
//! trace ids per entry. All trace ids inside one event are logically
//! independent; no shape is required to be present for any of them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::enums::{DataOutcome, MetadataOutcome};
use crate::types::id::{IdentityAssociation, TraceId};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub associations: Vec<IdentityAssociation>,
    pub metadata_outcomes: HashMap<MetadataOutcome, Vec<TraceId>>,
    pub data_outcomes: HashMap<DataOutcome, Vec<TraceId>>,
}

impl AuditEvent {
    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
            && self.metadata_outcomes.is_empty()
            && self.data_outcomes.is_empty()
    }

    /// Fold another event into this one. Used by the dispatcher's pending
    /// buffer to coalesce high-frequency local calls into one outbound
    /// message per flush tick.
    pub fn merge(&mut self, other: AuditEvent) {
        self.associations.extend(other.associations);
        for (outcome, trace_ids) in other.metadata_outcomes {
            self.metadata_outcomes
                .entry(outcome)
                .or_default()
                .extend(trace_ids);
        }
        for (outcome, trace_ids) in other.data_outcomes {
            self.data_outcomes
                .entry(outcome)
                .or_default()
                .extend(trace_ids);
        }
    }

    /// Event carrying only identity associations.
    pub fn with_associations(associations: Vec<IdentityAssociation>) -> Self {
        AuditEvent {
            associations,
            ..AuditEvent::default()
        }
    }

    /// Event carrying only metadata outcomes.
    pub fn with_metadata_outcomes(outcomes: HashMap<MetadataOutcome, Vec<TraceId>>) -> Self {
        AuditEvent {
            metadata_outcomes: outcomes,
            ..AuditEvent::default()
        }
    }

    /// Event carrying only data outcomes.
    pub fn with_data_outcomes(outcomes: HashMap<DataOutcome, Vec<TraceId>>) -> Self {
        AuditEvent {
            data_outcomes: outcomes,
            ..AuditEvent::default()
        }
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Completion listener that flags split-brain writes.

use std::collections::HashMap;

use vigil_kernel::{CompletionListener, CorrelationRecord, TraceId};

/// Logs every completion verdict and warns when exactly one side of the
/// write failed, meaning the metadata catalog and the bulk store now
/// disagree about this operation.
pub struct MismatchLogger;

impl CompletionListener for MismatchLogger {
    fn on_complete(
        &self,
        record: &CorrelationRecord,
        in_flight: &HashMap<TraceId, CorrelationRecord>,
    ) {
        metrics::increment_counter!("vigil_completions_total");

        let meta_failed = record
            .metadata_outcome
            .is_some_and(|outcome| outcome.is_failure());
        let data_failed = record
            .data_outcome
            .is_some_and(|outcome| outcome.is_failure());

        if meta_failed != data_failed {
            metrics::increment_counter!("vigil_completion_mismatches_total");
            tracing::warn!(
                record = ?record,
                in_flight = in_flight.len(),
                "storage write completed with mismatched outcomes"
            );
        } else {
            tracing::debug!(
                trace_id = %record.trace_id,
                in_flight = in_flight.len(),
                "storage write completed"
            );
        }
    }
}

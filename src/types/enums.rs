//! Outcome enums for the two storage sides.

use serde::{Deserialize, Serialize};

/// Reported result of the metadata-catalog half of a write operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataOutcome {
    Success,
    Duplicate,
    Failure,
    /// No metadata expected for this operation.
    NotApplicable,
    /// Inferred: a synchronous data failure short-circuits the pipeline
    /// before metadata storage is reached.
    StorageNotReachedForFailure,
    /// Inferred: synchronous duplicate data short-circuits the pipeline
    /// before metadata storage is reached.
    StorageNotReachedForDuplicate,
}

impl MetadataOutcome {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            MetadataOutcome::Failure | MetadataOutcome::StorageNotReachedForFailure
        )
    }
}

/// Reported result of the bulk-data-store half of a write operation.
/// The `Sync` variants are reported by pipelines that fail before the
/// asynchronous store is reached at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataOutcome {
    Success,
    Duplicate,
    Failure,
    DuplicateSync,
    FailureSync,
    NotApplicable,
}

impl DataOutcome {
    pub fn is_failure(self) -> bool {
        matches!(self, DataOutcome::Failure | DataOutcome::FailureSync)
    }
}

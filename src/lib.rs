// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! vigil-kernel: correlation engine that reconciles metadata-catalog and
//! bulk-data-store write outcomes into per-operation completion verdicts.

pub mod auditor;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod record;
pub mod snapshot;
pub mod types;

pub use auditor::{Auditor, CompletionListener};
pub use config::{AuditConfig, BenignTransition};
pub use dispatcher::{Dispatcher, EventSender, ShardRouting};
pub use event::AuditEvent;
pub use record::CorrelationRecord;
pub use types::enums::{DataOutcome, MetadataOutcome};
pub use types::id::{
    DataIdentity, IdentityAssociation, MetadataIdentity, MetadataSpecificity, TraceId,
};

#[cfg(test)]
pub mod tests;

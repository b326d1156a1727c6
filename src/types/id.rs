//! Identity types.

use serde::{Deserialize, Serialize};

/// Opaque correlation key shared by all reports describing one logical
/// write operation. Generated upstream and threaded through both storage
/// backends' write paths.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TraceId {
    fn from(s: &str) -> Self {
        TraceId(s.to_owned())
    }
}

impl core::fmt::Display for TraceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How much of the metadata catalog one write operation is expected to
/// touch. `NoMetadata` marks operations that legitimately never produce a
/// metadata outcome report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataSpecificity {
    Dataset,
    Group,
    NoMetadata,
}

/// Identity of a row in the metadata catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataIdentity {
    pub identifier: String,
    pub specificity: MetadataSpecificity,
}

/// Identity of an entry in the bulk data store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIdentity {
    pub identifier: String,
}

/// One (metadata identity, data identity, trace id) triple reported when
/// the write pipeline binds the two storage sides together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssociation {
    pub trace_id: TraceId,
    pub meta: MetadataIdentity,
    pub data: DataIdentity,
}

//! Snapshot decoding.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::GzDecoder;

use super::{Result, SnapshotError, MAGIC, VERSION};
use crate::record::CorrelationRecord;
use crate::types::id::TraceId;

/// Inverse of [`super::encode_records`]: verify the frame, inflate, and
/// rebuild the trace-id keyed map.
pub fn decode_records(bytes: &[u8]) -> Result<HashMap<TraceId, CorrelationRecord>> {
    // Frame floor: magic + version + trailer.
    if bytes.len() < 12 {
        return Err(SnapshotError::Truncated);
    }

    let (content, trailer) = bytes.split_at(bytes.len() - 4);
    let stored_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(content);
    if hasher.finalize() != stored_crc {
        return Err(SnapshotError::ChecksumMismatch);
    }

    if content[0..4] != MAGIC {
        return Err(SnapshotError::InvalidMagic);
    }
    let version = u32::from_le_bytes([content[4], content[5], content[6], content[7]]);
    if version != VERSION {
        return Err(SnapshotError::VersionMismatch(version));
    }

    let mut body = Vec::new();
    GzDecoder::new(&content[8..]).read_to_end(&mut body)?;

    let (list, _): (Vec<CorrelationRecord>, _) =
        bincode::serde::decode_from_slice(&body, bincode::config::standard())
            .map_err(|e| SnapshotError::Decode(e.to_string()))?;

    Ok(list
        .into_iter()
        .map(|record| (record.trace_id.clone(), record))
        .collect())
}

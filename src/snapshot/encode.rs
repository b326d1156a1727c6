//! Snapshot encoding.

use std::collections::HashMap;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::{Result, SnapshotError, MAGIC, VERSION};
use crate::record::CorrelationRecord;
use crate::types::id::TraceId;

/// Serialize the in-flight map to the framed, compressed on-disk form.
/// Records are sorted by trace id first so identical maps always produce
/// identical bytes.
pub fn encode_records(records: &HashMap<TraceId, CorrelationRecord>) -> Result<Vec<u8>> {
    let mut list: Vec<&CorrelationRecord> = records.values().collect();
    list.sort_by(|a, b| a.trace_id.cmp(&b.trace_id));

    let body = bincode::serde::encode_to_vec(&list, bincode::config::standard())
        .map_err(|e| SnapshotError::Encode(e.to_string()))?;

    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&body)?;
    let compressed = gz.finish()?;

    // [MAGIC][VERSION][gz body][CRC32 over everything before the trailer]
    let mut out = Vec::with_capacity(compressed.len() + 12);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&out);
    out.extend_from_slice(&hasher.finalize().to_le_bytes());
    Ok(out)
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Persistence codec for the in-flight correlation map.
//!
//! Used only at process boundaries: the engine persists its map at
//! graceful shutdown and reloads (then deletes) the file at startup. The
//! on-disk form is a flat list of records, bincode-encoded, gzipped, and
//! framed as `[MAGIC][VERSION][gz body][CRC32]`. The file never outlives
//! one load, so no cross-version compatibility is attempted: a version
//! mismatch is simply an error and the engine starts empty.

pub mod decode;
pub mod encode;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::CorrelationRecord;
use crate::types::id::TraceId;

pub use decode::decode_records;
pub use encode::encode_records;

pub const MAGIC: [u8; 4] = *b"VGIL";
pub const VERSION: u32 = 1;

/// Fixed prefix of the per-shard state file name.
pub const STATE_FILE_PREFIX: &str = "audit_state";
pub const STATE_FILE_EXTENSION: &str = ".bin.gz";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("snapshot too short")]
    Truncated,

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid magic")]
    InvalidMagic,

    #[error("version mismatch: found {0}")]
    VersionMismatch(u32),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Path of the persisted state file for one shard.
pub fn state_file_path(dir: &Path, shard_id: usize) -> PathBuf {
    dir.join(format!("{STATE_FILE_PREFIX}{shard_id}{STATE_FILE_EXTENSION}"))
}

/// Encode the map and write it to `path` via a temp file and rename, so
/// a crash mid-write never leaves a torn state file behind. Returns the
/// number of bytes written.
pub fn save_file(path: &Path, records: &HashMap<TraceId, CorrelationRecord>) -> Result<usize> {
    let bytes = encode_records(records)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_data()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(bytes.len())
}

/// Read and decode the state file at `path`.
pub fn load_file(path: &Path) -> Result<HashMap<TraceId, CorrelationRecord>> {
    let bytes = std::fs::read(path)?;
    decode_records(&bytes)
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! vigil-node: tokio runtime harness for the storage audit kernel.
//!
//! Wires one inbound channel per engine shard, a drain task per shard, a
//! periodic retention pass, the batch flush timer, and the process
//! lifecycle hooks around the kernel's persistence.

pub mod flusher;
pub mod lifecycle;
pub mod listener;
pub mod shard;
pub mod telemetry;
pub mod transport;

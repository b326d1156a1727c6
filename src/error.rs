//! Error types.

use thiserror::Error;

/// Failure handing a sub-event to a shard destination. Caught and logged
/// per shard by the dispatcher; never surfaced to submitters.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("destination unavailable: {0}")]
    Unavailable(String),

    #[error("send failed: {0}")]
    Send(String),
}

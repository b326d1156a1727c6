// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-process channel transport.
//!
//! One named destination per shard, backed by an unbounded mpsc channel.
//! Stands in for the external at-least-once message broker: delivery to
//! the drain task is asynchronous and the dispatcher's `send` never
//! blocks.

use std::collections::HashMap;

use tokio::sync::mpsc;

use vigil_kernel::error::TransportError;
use vigil_kernel::{AuditEvent, EventSender, ShardRouting};

pub struct ChannelTransport {
    channels: HashMap<String, mpsc::UnboundedSender<AuditEvent>>,
}

/// Receiving half of one shard's destination.
pub struct ShardInbox {
    pub shard_id: usize,
    pub destination: String,
    pub receiver: mpsc::UnboundedReceiver<AuditEvent>,
}

/// Build the transport and one inbox per shard from the routing table.
pub fn channel_transport(routing: &ShardRouting) -> (ChannelTransport, Vec<ShardInbox>) {
    let mut channels = HashMap::new();
    let mut inboxes = Vec::with_capacity(routing.shard_count());
    for shard_id in 0..routing.shard_count() {
        let destination = routing.destination(shard_id).to_owned();
        let (tx, rx) = mpsc::unbounded_channel();
        channels.insert(destination.clone(), tx);
        inboxes.push(ShardInbox {
            shard_id,
            destination,
            receiver: rx,
        });
    }
    (ChannelTransport { channels }, inboxes)
}

impl EventSender for ChannelTransport {
    fn send(&self, event: &AuditEvent, destination: &str) -> Result<(), TransportError> {
        let tx = self
            .channels
            .get(destination)
            .ok_or_else(|| TransportError::Unavailable(destination.to_owned()))?;
        tx.send(event.clone())
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::AuditConfig;
use crate::dispatcher::{stable_hash, Dispatcher, EventSender, ShardRouting};
use crate::error::TransportError;
use crate::event::AuditEvent;
use crate::types::enums::{DataOutcome, MetadataOutcome};
use crate::types::id::{
    DataIdentity, IdentityAssociation, MetadataIdentity, MetadataSpecificity, TraceId,
};

#[derive(Default)]
struct CapturingSender {
    sent: Mutex<Vec<(String, AuditEvent)>>,
}

impl EventSender for CapturingSender {
    fn send(&self, event: &AuditEvent, destination: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_owned(), event.clone()));
        Ok(())
    }
}

/// Fails sends to one destination, captures the rest.
struct PartiallyFailingSender {
    failing_destination: String,
    sent: Mutex<Vec<(String, AuditEvent)>>,
}

impl EventSender for PartiallyFailingSender {
    fn send(&self, event: &AuditEvent, destination: &str) -> Result<(), TransportError> {
        if destination == self.failing_destination {
            return Err(TransportError::Send("broker unavailable".to_owned()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_owned(), event.clone()));
        Ok(())
    }
}

fn config(shards: usize) -> AuditConfig {
    AuditConfig {
        shard_count: shards,
        ..AuditConfig::default()
    }
}

fn dispatcher_with(
    cfg: &AuditConfig,
) -> (Dispatcher, &'static CapturingSender) {
    // Leak the sender so the test can inspect it after handing ownership
    // to the dispatcher.
    let sender: &'static CapturingSender = Box::leak(Box::default());
    let routing = ShardRouting::from_config(cfg);
    (Dispatcher::new(cfg, routing, Box::new(SenderRef(sender))), sender)
}

struct SenderRef(&'static CapturingSender);

impl EventSender for SenderRef {
    fn send(&self, event: &AuditEvent, destination: &str) -> Result<(), TransportError> {
        self.0.send(event, destination)
    }
}

fn association(trace: &str) -> IdentityAssociation {
    IdentityAssociation {
        trace_id: TraceId::from(trace),
        meta: MetadataIdentity {
            identifier: format!("meta-{trace}"),
            specificity: MetadataSpecificity::Dataset,
        },
        data: DataIdentity {
            identifier: format!("data-{trace}"),
        },
    }
}

fn mixed_event(traces: &[&str]) -> AuditEvent {
    AuditEvent {
        associations: traces.iter().map(|t| association(t)).collect(),
        metadata_outcomes: HashMap::from([(
            MetadataOutcome::Success,
            traces.iter().map(|t| TraceId::from(*t)).collect(),
        )]),
        data_outcomes: HashMap::from([(
            DataOutcome::Success,
            traces.iter().map(|t| TraceId::from(*t)).collect(),
        )]),
    }
}

#[test]
fn test_stable_hash_is_deterministic() {
    assert_eq!(stable_hash("trace-1"), stable_hash("trace-1"));
    assert_ne!(stable_hash("trace-1"), stable_hash("trace-2"));
}

#[test]
fn test_shard_assignment_is_pure_and_stable() {
    let a = ShardRouting::new(5, "audit.event.");
    let b = ShardRouting::new(5, "audit.event.");
    for trace in ["t1", "t2", "a-much-longer-trace-id/with/path:1234"] {
        let id = TraceId::from(trace);
        assert_eq!(a.shard_for(&id), b.shard_for(&id));
        assert!(a.shard_for(&id) < 5);
    }
}

#[test]
fn test_destination_names_are_one_indexed() {
    let routing = ShardRouting::new(3, "audit.event.");
    assert_eq!(routing.destination(0), "audit.event.1");
    assert_eq!(routing.destination(2), "audit.event.3");
}

#[test]
fn test_zero_shards_clamps_to_one() {
    let routing = ShardRouting::new(0, "audit.event.");
    assert_eq!(routing.shard_count(), 1);
    assert_eq!(routing.shard_for(&TraceId::from("t1")), 0);
}

#[test]
fn test_submit_partitions_every_shape_by_trace_id() {
    let cfg = config(4);
    let (dispatcher, sender) = dispatcher_with(&cfg);
    let routing = ShardRouting::from_config(&cfg);
    let traces = ["t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8"];

    dispatcher.submit(mixed_event(&traces));

    let sent = sender.sent.lock().unwrap();
    let mut seen_traces = 0usize;
    for (destination, sub_event) in sent.iter() {
        for assoc in &sub_event.associations {
            assert_eq!(
                destination,
                routing.destination(routing.shard_for(&assoc.trace_id))
            );
        }
        for ids in sub_event.metadata_outcomes.values() {
            for id in ids {
                assert_eq!(destination, routing.destination(routing.shard_for(id)));
                seen_traces += 1;
            }
        }
        for ids in sub_event.data_outcomes.values() {
            for id in ids {
                assert_eq!(destination, routing.destination(routing.shard_for(id)));
            }
        }
        assert!(!sub_event.is_empty());
    }
    // No trace id lost or duplicated across the split.
    assert_eq!(seen_traces, traces.len());
}

#[test]
fn test_submit_skips_empty_sub_events() {
    let cfg = config(8);
    let (dispatcher, sender) = dispatcher_with(&cfg);

    dispatcher.submit(AuditEvent::with_associations(vec![association("only")]));

    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
}

#[test]
fn test_send_failure_is_isolated_per_shard() {
    let cfg = config(4);
    let routing = ShardRouting::from_config(&cfg);
    let traces = ["t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8"];
    // Fail whichever shard t1 maps to.
    let failing = routing
        .destination(routing.shard_for(&TraceId::from("t1")))
        .to_owned();

    let sender: &'static PartiallyFailingSender = Box::leak(Box::new(PartiallyFailingSender {
        failing_destination: failing.clone(),
        sent: Mutex::new(Vec::new()),
    }));
    struct Fwd(&'static PartiallyFailingSender);
    impl EventSender for Fwd {
        fn send(&self, event: &AuditEvent, destination: &str) -> Result<(), TransportError> {
            self.0.send(event, destination)
        }
    }
    let dispatcher = Dispatcher::new(&cfg, routing.clone(), Box::new(Fwd(sender)));

    dispatcher.submit(mixed_event(&traces));

    let sent = sender.sent.lock().unwrap();
    assert!(!sent.is_empty());
    // Every non-failing shard with content still got its sub-event.
    for (destination, _) in sent.iter() {
        assert_ne!(*destination, failing);
    }
    let delivered: usize = sent
        .iter()
        .flat_map(|(_, e)| e.metadata_outcomes.values())
        .map(|ids| ids.len())
        .sum();
    let failed_shard_traces = traces
        .iter()
        .filter(|t| routing.destination(routing.shard_for(&TraceId::from(**t))) == failing)
        .count();
    assert_eq!(delivered, traces.len() - failed_shard_traces);
}

#[test]
fn test_disabled_dispatcher_sends_nothing() {
    let cfg = AuditConfig {
        enabled: false,
        ..config(4)
    };
    let (dispatcher, sender) = dispatcher_with(&cfg);

    dispatcher.submit(mixed_event(&["t1", "t2"]));
    dispatcher.buffer(mixed_event(&["t3"]));
    dispatcher.flush();

    assert!(sender.sent.lock().unwrap().is_empty());
}

#[test]
fn test_buffer_then_flush_coalesces_events() {
    let cfg = config(1);
    let (dispatcher, sender) = dispatcher_with(&cfg);

    dispatcher.buffer(AuditEvent::with_metadata_outcomes(HashMap::from([(
        MetadataOutcome::Success,
        vec![TraceId::from("t1")],
    )])));
    dispatcher.buffer(AuditEvent::with_metadata_outcomes(HashMap::from([(
        MetadataOutcome::Success,
        vec![TraceId::from("t2")],
    )])));
    assert!(sender.sent.lock().unwrap().is_empty());

    dispatcher.flush();
    {
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let ids = &sent[0].1.metadata_outcomes[&MetadataOutcome::Success];
        assert_eq!(ids.len(), 2);
    }

    // The buffer was drained; an idle flush sends nothing.
    dispatcher.flush();
    assert_eq!(sender.sent.lock().unwrap().len(), 1);
}

#[test]
fn test_single_shape_entry_points() {
    let cfg = config(1);
    let (dispatcher, sender) = dispatcher_with(&cfg);

    dispatcher.submit_associations(vec![association("t1")]);
    dispatcher.submit_metadata_outcomes(HashMap::from([(
        MetadataOutcome::Failure,
        vec![TraceId::from("t2")],
    )]));
    dispatcher.submit_data_outcomes(HashMap::from([(
        DataOutcome::Success,
        vec![TraceId::from("t3")],
    )]));
    dispatcher.submit_associations(Vec::new());

    assert_eq!(sender.sent.lock().unwrap().len(), 3);
}

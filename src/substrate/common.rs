use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use cortexevo_rt::Mailbox;
use cortexevo_utils::NodeId;

use crate::record::ConnectionId;
use crate::substrate::message::NodeMessage;

/// An edge as seen from the node it leaves: a handle to the downstream
/// actor plus the weight cached from the downstream's inbound record at
/// construction time. Firing reads this cache, not the downstream's own
/// record, to decide what to send; a learning update changes the
/// downstream's stored record (consulted at teardown) without touching
/// this cache, so weight adaptation is a between-generations effect rather
/// than a within-episode one.
#[derive(Clone)]
pub struct OutboundEdge {
    pub to: NodeId,
    pub mailbox: Mailbox<NodeMessage>,
    pub connection_id: ConnectionId,
    pub weight: f64,
    pub connection_order: Option<u32>,
}

/// Tracks, across one think cycle, which actuators have fired since the
/// last `Sync`. Shared (via `Arc`) between the cortex, which waits on it,
/// and every actuator, which marks itself in it after emitting an output.
#[derive(Default)]
pub struct FiredTracker {
    fired: Mutex<std::collections::HashSet<NodeId>>,
    condvar: Condvar,
}

impl FiredTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Clears marks ahead of a new think cycle.
    pub fn reset(&self) {
        self.fired.lock().expect("fired tracker mutex poisoned").clear();
    }

    /// Records that `actuator` has fired since the last reset.
    pub fn mark(&self, actuator: NodeId) {
        let mut guard = self.fired.lock().expect("fired tracker mutex poisoned");
        guard.insert(actuator);
        self.condvar.notify_all();
    }

    /// Blocks until every id in `expected` has been marked or `timeout`
    /// elapses. Returns `true` iff every actuator fired in time.
    pub fn wait_until_all(&self, expected: &[NodeId], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.fired.lock().expect("fired tracker mutex poisoned");
        loop {
            if expected.iter().all(|id| guard.contains(id)) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (next_guard, result) = self
                .condvar
                .wait_timeout(guard, remaining)
                .expect("fired tracker mutex poisoned");
            guard = next_guard;
            if result.timed_out() && !expected.iter().all(|id| guard.contains(id)) {
                return false;
            }
        }
    }
}

/// Barrier bookkeeping shared by neuron and actuator actors: a static
/// threshold (the in-degree) and the synapses collected since the barrier
/// last emptied.
///
/// Collected as a plain list rather than keyed by sender, because a single
/// upstream node (most commonly a sensor) may legitimately hold more than
/// one distinct edge into the same downstream node — each arrival is its
/// own synapse and must be counted individually. Carries the connection id
/// alongside each synapse so a firing neuron can map presynaptic values back
/// to the specific inbound record a Hebbian update should adjust.
#[derive(Default)]
pub struct Barrier {
    pub threshold: u32,
    received: Vec<(ConnectionId, f64, f64)>,
}

impl Barrier {
    pub fn receive(&mut self, connection_id: ConnectionId, value: f64, weight: f64) {
        self.received.push((connection_id, value, weight));
    }

    pub fn is_full(&self) -> bool {
        self.threshold > 0 && self.received.len() as u32 >= self.threshold
    }

    /// Empties the barrier, returning every `(connection_id, value, weight)`
    /// synapse collected since the last drain.
    pub fn drain(&mut self) -> Vec<(ConnectionId, f64, f64)> {
        std::mem::take(&mut self.received)
    }
}

/// Sum of `value * weight` over a drained barrier.
pub fn weighted_sum(synapses: &[(ConnectionId, f64, f64)]) -> f64 {
    synapses.iter().map(|(_, value, weight)| value * weight).sum()
}

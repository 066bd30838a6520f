use cortexevo_rt::{Mailbox, Reply};
use cortexevo_utils::NodeId;

use crate::record::{ConnectionId, NodeRecord};

/// The message alphabet shared by sensor, neuron, and actuator actors.
pub enum NodeMessage {
    /// Tell a sensor to read its input source and emit one synapse per
    /// outbound edge. Ignored by neurons and actuators.
    Sync,
    /// One arrived synapse: which inbound connection it travelled on (used
    /// by the receiver to apply Hebbian updates to the right record), the
    /// sender's id, its value, and the weight cached on the sender's
    /// outbound edge.
    ReceiveInput {
        connection_id: ConnectionId,
        from: NodeId,
        value: f64,
        weight: f64,
    },
    /// Sent to a downstream node during wiring so its barrier threshold
    /// tracks the in-degree being built up edge by edge.
    IncrementBarrierThreshold { reply: Reply<()> },
    /// Sent to an upstream node during wiring: attach one more resolved
    /// outbound edge.
    AttachOutbound {
        to: NodeId,
        mailbox: Mailbox<NodeMessage>,
        connection_id: ConnectionId,
        weight: f64,
        connection_order: Option<u32>,
        reply: Reply<()>,
    },
    /// Ask the actor to hand back its current state as a [`NodeRecord`] and
    /// then terminate. The final message any actor ever processes.
    Drain { reply: Reply<NodeRecord> },
}

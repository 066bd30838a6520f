use std::sync::Arc;

use cortexevo_rt::{spawn_actor, ActorHandle};
use cortexevo_utils::FunctionId;
use log::trace;

use crate::record::{NodeRecord, NodeRecordType};
use crate::substrate::common::{weighted_sum, Barrier, FiredTracker};
use crate::substrate::message::NodeMessage;

/// Spawns an actuator actor. `output_hook` is invoked with the barrier's
/// weighted sum each time it fills, already bound to whichever score keeper
/// (or other sink) the cortex materialised it against.
///
/// # Panics
/// Panics if `record.node_type` is not [`NodeRecordType::Actuator`].
pub fn spawn_actuator(
    record: NodeRecord,
    output_hook: Arc<dyn Fn(f64) + Send + Sync>,
    fired_tracker: Arc<FiredTracker>,
) -> ActorHandle<NodeMessage> {
    assert!(
        record.node_type.is_actuator(),
        "spawn_actuator given a non-actuator record"
    );

    let node_id = record.node_id;
    let layer = record.layer;
    let mut inbound = record.inbound_connections;
    let output_hook_id: FunctionId = record.output_hook_id.expect("actuator without output_hook_id");
    let mut barrier = Barrier::default();

    spawn_actor(move |message: NodeMessage| -> bool {
        match message {
            NodeMessage::ReceiveInput {
                connection_id,
                value,
                weight,
                ..
            } => {
                barrier.receive(connection_id, value, weight);
                if barrier.is_full() {
                    let synapses = barrier.drain();
                    let output = weighted_sum(&synapses);
                    trace!("actuator {node_id} fired: output={output}");
                    output_hook(output);
                    fired_tracker.mark(node_id);
                }
                true
            }
            NodeMessage::Sync => true,
            NodeMessage::IncrementBarrierThreshold { reply } => {
                barrier.threshold += 1;
                reply.send(());
                true
            }
            NodeMessage::AttachOutbound { reply, .. } => {
                // Actuators have no outbound edges; acknowledge and ignore.
                reply.send(());
                true
            }
            NodeMessage::Drain { reply } => {
                reply.send(NodeRecord {
                    node_id,
                    layer,
                    node_type: NodeRecordType::Actuator,
                    inbound_connections: std::mem::take(&mut inbound),
                    bias: None,
                    activation_function_id: None,
                    sync_function_id: None,
                    output_hook_id: Some(output_hook_id),
                    maximum_vector_length: None,
                    learning_algorithm: Default::default(),
                });
                false
            }
        }
    })
}

use std::collections::HashMap;
use std::sync::Arc;

use cortexevo_rt::{spawn_actor, ActorHandle};
use log::trace;

use crate::record::{ConnectionId, InactiveConnection, LearningAlgorithm, NodeRecord, NodeRecordType};
use crate::substrate::common::{weighted_sum, Barrier, OutboundEdge};
use crate::substrate::message::NodeMessage;

/// Spawns a neuron actor seeded from `record`, using `activation` to map its
/// barrier sum (plus bias) to an output on every firing.
///
/// # Panics
/// Panics if `record.node_type` is not [`NodeRecordType::Neuron`].
pub fn spawn_neuron(
    record: NodeRecord,
    activation: Arc<dyn Fn(f64) -> f64 + Send + Sync>,
) -> ActorHandle<NodeMessage> {
    assert!(
        record.node_type.is_neuron(),
        "spawn_neuron given a non-neuron record"
    );

    let node_id = record.node_id;
    let layer = record.layer;
    let mut inbound: HashMap<ConnectionId, InactiveConnection> = record.inbound_connections;
    let bias = record.bias;
    let activation_function_id = record.activation_function_id;
    let learning_algorithm = record.learning_algorithm;
    let mut outbound: Vec<OutboundEdge> = Vec::new();
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
                    let output = activation(weighted_sum(&synapses) + bias.unwrap_or(0.0));
                    trace!("neuron {node_id} fired: output={output}");

                    if let LearningAlgorithm::Hebbian { rate } = learning_algorithm {
                        for (connection_id, presynaptic, _weight) in &synapses {
                            if let Some(connection) = inbound.get_mut(connection_id) {
                                connection.weight += rate * presynaptic * output;
                            }
                        }
                    }

                    for edge in &outbound {
                        edge.mailbox.post(NodeMessage::ReceiveInput {
                            connection_id: edge.connection_id,
                            from: node_id,
                            value: output,
                            weight: edge.weight,
                        });
                    }
                }
                true
            }
            NodeMessage::Sync => true,
            NodeMessage::IncrementBarrierThreshold { reply } => {
                barrier.threshold += 1;
                reply.send(());
                true
            }
            NodeMessage::AttachOutbound {
                to,
                mailbox,
                connection_id,
                weight,
                connection_order,
                reply,
            } => {
                outbound.push(OutboundEdge {
                    to,
                    mailbox,
                    connection_id,
                    weight,
                    connection_order,
                });
                reply.send(());
                true
            }
            NodeMessage::Drain { reply } => {
                reply.send(NodeRecord {
                    node_id,
                    layer,
                    node_type: NodeRecordType::Neuron,
                    inbound_connections: std::mem::take(&mut inbound),
                    bias,
                    activation_function_id,
                    sync_function_id: None,
                    output_hook_id: None,
                    maximum_vector_length: None,
                    learning_algorithm,
                });
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InactiveConnection;
    use cortexevo_rt::{Mailbox, Reply};
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn fires_once_barrier_fills_and_applies_bias() {
        let mut record = NodeRecord::new_neuron(1, 1, 0);
        record.bias = Some(1.0);
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        record.inbound_connections.insert(
            c1,
            InactiveConnection {
                connection_order: Some(0),
                from_node: 0,
                weight: 2.0,
            },
        );
        record.inbound_connections.insert(
            c2,
            InactiveConnection {
                connection_order: Some(1),
                from_node: 0,
                weight: 4.0,
            },
        );

        let handle = spawn_neuron(record, Arc::new(|x| x));

        let (downstream, downstream_rx) = Mailbox::new();
        let (reply, waiter) = Reply::new();
        handle.post(NodeMessage::AttachOutbound {
            to: 2,
            mailbox: downstream,
            connection_id: Uuid::new_v4(),
            weight: 1.0,
            connection_order: None,
            reply,
        });
        waiter.wait(Duration::from_secs(1)).unwrap();

        for _ in 0..2 {
            let (reply, waiter) = Reply::new();
            handle.post(NodeMessage::IncrementBarrierThreshold { reply });
            waiter.wait(Duration::from_secs(1)).unwrap();
        }

        handle.post(NodeMessage::ReceiveInput {
            connection_id: c1,
            from: 0,
            value: 0.5,
            weight: 2.0,
        });
        handle.post(NodeMessage::ReceiveInput {
            connection_id: c2,
            from: 0,
            value: 0.25,
            weight: 4.0,
        });

        let forwarded = downstream_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        match forwarded {
            NodeMessage::ReceiveInput { value, .. } => assert_eq!(value, 3.0),
            _ => panic!("expected ReceiveInput"),
        }

        let (reply, waiter) = Reply::new();
        handle.post(NodeMessage::Drain { reply });
        waiter.wait(Duration::from_secs(1)).unwrap();
        handle.join();
    }
}

use std::sync::Arc;

use cortexevo_rt::{spawn_actor, ActorHandle};
use cortexevo_utils::FunctionId;
use log::trace;

use crate::record::{NodeRecord, NodeRecordType};
use crate::substrate::common::OutboundEdge;
use crate::substrate::message::NodeMessage;

/// Spawns a sensor actor. `sync` is called once per `Sync` message and must
/// yield the sequence of values to distribute across outbound edges; it is
/// already bound to whatever per-network data source it reads from.
///
/// # Panics
/// Panics if `record.node_type` is not [`NodeRecordType::Sensor`].
pub fn spawn_sensor(
    record: NodeRecord,
    mut sync: Box<dyn FnMut() -> Vec<f64> + Send>,
) -> ActorHandle<NodeMessage> {
    assert!(
        record.node_type.is_sensor(),
        "spawn_sensor given a non-sensor record"
    );

    let node_id = record.node_id;
    let sync_function_id: FunctionId = record.sync_function_id.expect("sensor without sync_function_id");
    let maximum_vector_length = record.maximum_vector_length;
    let mut outbound: Vec<OutboundEdge> = Vec::new();

    spawn_actor(move |message: NodeMessage| -> bool {
        match message {
            NodeMessage::Sync => {
                let values = sync();
                if !values.is_empty() && !outbound.is_empty() {
                    let mut ordered = outbound.clone();
                    ordered.sort_by_key(|edge| edge.connection_order.unwrap_or(0));
                    for (i, edge) in ordered.iter().enumerate() {
                        let value = values[i % values.len()];
                        trace!("sensor {node_id} emitting {value} on edge to {}", edge.to);
                        edge.mailbox.post(NodeMessage::ReceiveInput {
                            connection_id: edge.connection_id,
                            from: node_id,
                            value,
                            weight: edge.weight,
                        });
                    }
                }
                true
            }
            NodeMessage::ReceiveInput { .. } => true,
            NodeMessage::IncrementBarrierThreshold { reply } => {
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
                    layer: 0,
                    node_type: NodeRecordType::Sensor {
                        outbound_count: outbound.len() as u32,
                    },
                    inbound_connections: Default::default(),
                    bias: None,
                    activation_function_id: None,
                    sync_function_id: Some(sync_function_id),
                    output_hook_id: None,
                    maximum_vector_length,
                    learning_algorithm: Default::default(),
                });
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortexevo_rt::{Mailbox, Reply};
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn distributes_values_in_connection_order_with_rotation() {
        let record = NodeRecord::new_sensor(0, 100, Some(2));
        let mut values = vec![9.0];
        let handle = spawn_sensor(
            record,
            Box::new(move || std::mem::replace(&mut values, vec![9.0])),
        );

        let (edge_a, rx_a) = Mailbox::new();
        let (edge_b, rx_b) = Mailbox::new();
        for (order, edge) in [(1u32, edge_a), (0u32, edge_b)] {
            let (reply, waiter) = Reply::new();
            handle.post(NodeMessage::AttachOutbound {
                to: order as u64 + 1,
                mailbox: edge,
                connection_id: Uuid::new_v4(),
                weight: 1.0,
                connection_order: Some(order),
                reply,
            });
            waiter.wait(Duration::from_secs(1)).unwrap();
        }

        handle.post(NodeMessage::Sync);

        let first = rx_b.recv_timeout(Duration::from_secs(1)).unwrap();
        let second = rx_a.recv_timeout(Duration::from_secs(1)).unwrap();
        for received in [first, second] {
            match received {
                NodeMessage::ReceiveInput { value, .. } => assert_eq!(value, 9.0),
                _ => panic!("expected ReceiveInput"),
            }
        }

        let (reply, waiter) = Reply::new();
        handle.post(NodeMessage::Drain { reply });
        let drained = waiter.wait(Duration::from_secs(1)).unwrap();
        assert!(matches!(
            drained.node_type,
            NodeRecordType::Sensor { outbound_count: 2 }
        ));
        handle.join();
    }
}

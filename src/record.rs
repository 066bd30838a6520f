//! The canonical, serialisable description of a network: [`NodeRecord`] and
//! [`NodeRecords`]. This is the form records take while they are owned by
//! the caller or the mutation engine; the live substrate (see
//! [`crate::substrate`]) is this data's running embodiment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use cortexevo_utils::{FunctionId, NodeId};

/// Identifier of one inbound connection within a [`NodeRecord`]. Kept as a
/// `Uuid` rather than a sequential integer so connections can be created,
/// removed, and re-keyed by the mutation engine without ever colliding,
/// matching how this codebase already identifies synapses.
pub type ConnectionId = Uuid;

/// Whether and how a neuron's inbound weights adapt as it fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LearningAlgorithm {
    /// Weights never change once constructed.
    NoLearning,
    /// Classic Hebbian update: `weight += rate * presynaptic * postsynaptic`
    /// applied after every firing.
    Hebbian { rate: f64 },
}

impl Default for LearningAlgorithm {
    fn default() -> Self {
        Self::NoLearning
    }
}

/// The role a node plays in the graph. `Sensor` and `Actuator` are the only
/// two variants with scope for extra static data (`outbound_count` lets
/// mutations respect a sensor's fan-out cap without walking the whole
/// record set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRecordType {
    Neuron,
    Sensor { outbound_count: u32 },
    Actuator,
}

impl NodeRecordType {
    pub fn is_neuron(&self) -> bool {
        matches!(self, Self::Neuron)
    }

    pub fn is_sensor(&self) -> bool {
        matches!(self, Self::Sensor { .. })
    }

    pub fn is_actuator(&self) -> bool {
        matches!(self, Self::Actuator)
    }
}

/// One edge arriving at a node, as seen from the downstream side.
///
/// `connection_order` only has meaning when `from_node` is a sensor: it is
/// the positional index into that sensor's synchronised value sequence that
/// feeds this particular edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InactiveConnection {
    pub connection_order: Option<u32>,
    pub from_node: NodeId,
    pub weight: f64,
}

/// The serialisable description of one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub layer: i32,
    pub node_type: NodeRecordType,
    pub inbound_connections: HashMap<ConnectionId, InactiveConnection>,
    pub bias: Option<f64>,
    pub activation_function_id: Option<FunctionId>,
    pub sync_function_id: Option<FunctionId>,
    pub output_hook_id: Option<FunctionId>,
    pub maximum_vector_length: Option<u32>,
    pub learning_algorithm: LearningAlgorithm,
}

impl NodeRecord {
    /// Builds a bare neuron record with no inbound connections and no bias.
    pub fn new_neuron(node_id: NodeId, layer: i32, activation_function_id: FunctionId) -> Self {
        Self {
            node_id,
            layer,
            node_type: NodeRecordType::Neuron,
            inbound_connections: HashMap::new(),
            bias: None,
            activation_function_id: Some(activation_function_id),
            sync_function_id: None,
            output_hook_id: None,
            maximum_vector_length: None,
            learning_algorithm: LearningAlgorithm::NoLearning,
        }
    }

    /// Builds a bare sensor record with no outbound edges yet.
    pub fn new_sensor(
        node_id: NodeId,
        sync_function_id: FunctionId,
        maximum_vector_length: Option<u32>,
    ) -> Self {
        Self {
            node_id,
            layer: 0,
            node_type: NodeRecordType::Sensor { outbound_count: 0 },
            inbound_connections: HashMap::new(),
            bias: None,
            activation_function_id: None,
            sync_function_id: Some(sync_function_id),
            output_hook_id: None,
            maximum_vector_length,
            learning_algorithm: LearningAlgorithm::NoLearning,
        }
    }

    /// Builds a bare actuator record.
    pub fn new_actuator(node_id: NodeId, layer: i32, output_hook_id: FunctionId) -> Self {
        Self {
            node_id,
            layer,
            node_type: NodeRecordType::Actuator,
            inbound_connections: HashMap::new(),
            bias: None,
            activation_function_id: None,
            sync_function_id: None,
            output_hook_id: Some(output_hook_id),
            maximum_vector_length: None,
            learning_algorithm: LearningAlgorithm::NoLearning,
        }
    }

    /// Number of sensor-sourced inbound connections whose `from_node`
    /// resolves to `sensor_id` within `records`.
    pub fn sensor_sourced_inbound(&self) -> impl Iterator<Item = (&ConnectionId, &InactiveConnection)> {
        self.inbound_connections
            .iter()
            .filter(|(_, c)| c.connection_order.is_some())
    }
}

/// A whole network in record form: every node keyed by its [`NodeId`].
pub type NodeRecords = HashMap<NodeId, NodeRecord>;

/// A violated structural invariant of the record data model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("node {0} has an activation_function_id but is not a neuron, or is a neuron without one")]
    ActivationIdMismatch(NodeId),
    #[error("node {0} has a sync_function_id but is not a sensor, or is a sensor without one")]
    SyncIdMismatch(NodeId),
    #[error("node {0} has an output_hook_id but is not an actuator, or is an actuator without one")]
    OutputHookIdMismatch(NodeId),
    #[error("sensor {0} has inbound connections but sensors must have none")]
    SensorHasInbound(NodeId),
    #[error("connection on node {downstream} references unknown node {from_node}")]
    DanglingConnection { downstream: NodeId, from_node: NodeId },
    #[error("actuator {0} is referenced as a from_node, but actuators may have no outbound edges")]
    ActuatorHasOutbound(NodeId),
    #[error("sensor {sensor} outbound_count {recorded} does not match {actual} resolved references")]
    SensorOutboundCountMismatch {
        sensor: NodeId,
        recorded: u32,
        actual: u32,
    },
    #[error("sensor {0}'s outbound connection_order values are not a dense 0..k prefix")]
    NonDenseConnectionOrder(NodeId),
}

/// Validates every structural invariant against a full record set. Called by the
/// mutation engine after every edit and by the cortex constructor before
/// materialising a network, so a bug in either can never smuggle a broken
/// topology into the live substrate.
pub fn validate(records: &NodeRecords) -> Result<(), RecordError> {
    let mut sensor_reference_counts: HashMap<NodeId, u32> = HashMap::new();
    // connection_order indexes a sensor's own outbound fan-out (which of its
    // edges gets which position in its synchronised value sequence), so the
    // dense 0..k invariant is checked per sensor across every downstream
    // that references it, not per downstream record.
    let mut sensor_connection_orders: HashMap<NodeId, Vec<u32>> = HashMap::new();

    for record in records.values() {
        if record.node_type.is_neuron() != record.activation_function_id.is_some() {
            return Err(RecordError::ActivationIdMismatch(record.node_id));
        }
        if record.node_type.is_sensor() != record.sync_function_id.is_some() {
            return Err(RecordError::SyncIdMismatch(record.node_id));
        }
        if record.node_type.is_actuator() != record.output_hook_id.is_some() {
            return Err(RecordError::OutputHookIdMismatch(record.node_id));
        }
        if record.node_type.is_sensor() && !record.inbound_connections.is_empty() {
            return Err(RecordError::SensorHasInbound(record.node_id));
        }

        for connection in record.inbound_connections.values() {
            let upstream = records
                .get(&connection.from_node)
                .ok_or(RecordError::DanglingConnection {
                    downstream: record.node_id,
                    from_node: connection.from_node,
                })?;
            if upstream.node_type.is_actuator() {
                return Err(RecordError::ActuatorHasOutbound(connection.from_node));
            }
            if upstream.node_type.is_sensor() {
                *sensor_reference_counts.entry(connection.from_node).or_insert(0) += 1;
                let order = connection
                    .connection_order
                    .ok_or(RecordError::NonDenseConnectionOrder(connection.from_node))?;
                sensor_connection_orders
                    .entry(connection.from_node)
                    .or_default()
                    .push(order);
            }
        }
    }

    for (sensor_id, mut orders) in sensor_connection_orders {
        orders.sort_unstable();
        for (i, order) in orders.iter().enumerate() {
            if *order != i as u32 {
                return Err(RecordError::NonDenseConnectionOrder(sensor_id));
            }
        }
    }

    for record in records.values() {
        if let NodeRecordType::Sensor { outbound_count } = record.node_type {
            let actual = sensor_reference_counts.get(&record.node_id).copied().unwrap_or(0);
            if outbound_count != actual {
                return Err(RecordError::SensorOutboundCountMismatch {
                    sensor: record.node_id,
                    recorded: outbound_count,
                    actual,
                });
            }
            if let Some(max) = record.maximum_vector_length {
                if max > 0 && actual > max {
                    return Err(RecordError::SensorOutboundCountMismatch {
                        sensor: record.node_id,
                        recorded: max,
                        actual,
                    });
                }
            }
        }
    }

    Ok(())
}

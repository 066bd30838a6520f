//! The cortex coordinator: constructs a live actor graph from a
//! [`NodeRecords`](crate::record::NodeRecords), drives think cycles across
//! it, and tears it back down into records.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cortexevo_rt::{ActorHandle, Reply};
use cortexevo_utils::{FunctionId, NodeId};
use log::{debug, info, warn};
use thiserror::Error;

use crate::record::{self, NodeRecordType, NodeRecords, RecordError};
use crate::substrate::{spawn_actuator, spawn_neuron, spawn_sensor, FiredTracker, NodeMessage};
use crate::tables::{ActivationFunctions, NetworkId, OutputHookFunctions, SyncFunctionSources};

/// Failure modes of constructing or tearing down a live cortex.
#[derive(Debug, Error)]
pub enum CortexError {
    #[error(transparent)]
    InvalidRecords(#[from] RecordError),
    #[error("neuron {node} references unknown activation function {function}")]
    MissingActivationFunction { node: NodeId, function: FunctionId },
    #[error("sensor {node} references unknown sync function {function}")]
    MissingSyncFunction { node: NodeId, function: FunctionId },
    #[error("actuator {node} references unknown output hook {function}")]
    MissingOutputHook { node: NodeId, function: FunctionId },
    #[error("node {0}'s actor did not respond before its mailbox disconnected")]
    ActorUnresponsive(NodeId),
}

/// Result of one `ThinkAndAct` wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkOutcome {
    /// Every actuator fired since the last `Sync`.
    ThinkCycleFinished,
    /// The timeout elapsed before every actuator fired.
    ThinkCycleIncomplete,
}

/// A live, running instantiation of a [`NodeRecords`] topology.
pub struct Cortex {
    handles: HashMap<NodeId, ActorHandle<NodeMessage>>,
    sensors: Vec<NodeId>,
    actuators: Vec<NodeId>,
    fired_tracker: Arc<FiredTracker>,
}

impl Cortex {
    /// Validates `records`, spawns one actor per node, and wires every
    /// inbound connection: the upstream gets an outbound edge, the
    /// downstream's barrier threshold is incremented, awaiting each
    /// acknowledgement before continuing so no node can fire before its
    /// full in-degree is known.
    pub fn construct(
        records: &NodeRecords,
        network_id: NetworkId,
        activation_functions: &ActivationFunctions,
        sync_function_sources: &SyncFunctionSources,
        output_hook_functions: &OutputHookFunctions,
    ) -> Result<Self, CortexError> {
        record::validate(records)?;

        let fired_tracker = FiredTracker::new();
        let mut handles: HashMap<NodeId, ActorHandle<NodeMessage>> = HashMap::with_capacity(records.len());
        let mut sensors = Vec::new();
        let mut actuators = Vec::new();

        for node in records.values() {
            let handle = match node.node_type {
                NodeRecordType::Neuron => {
                    let function_id = node.activation_function_id.expect("validated neuron has activation id");
                    let activation = activation_functions
                        .get(&function_id)
                        .ok_or(CortexError::MissingActivationFunction {
                            node: node.node_id,
                            function: function_id,
                        })?
                        .clone();
                    spawn_neuron(node.clone(), activation)
                }
                NodeRecordType::Sensor { .. } => {
                    sensors.push(node.node_id);
                    let function_id = node.sync_function_id.expect("validated sensor has sync id");
                    let source = sync_function_sources
                        .get(&function_id)
                        .ok_or(CortexError::MissingSyncFunction {
                            node: node.node_id,
                            function: function_id,
                        })?;
                    spawn_sensor(node.clone(), source(network_id))
                }
                NodeRecordType::Actuator => {
                    actuators.push(node.node_id);
                    let function_id = node.output_hook_id.expect("validated actuator has output hook id");
                    let hook = output_hook_functions
                        .get(&function_id)
                        .ok_or(CortexError::MissingOutputHook {
                            node: node.node_id,
                            function: function_id,
                        })?
                        .clone();
                    let bound_hook: Arc<dyn Fn(f64) + Send + Sync> = Arc::new(move |value| hook(network_id, value));
                    spawn_actuator(node.clone(), bound_hook, fired_tracker.clone())
                }
            };
            handles.insert(node.node_id, handle);
        }

        for downstream in records.values() {
            for (connection_id, connection) in &downstream.inbound_connections {
                let upstream_handle = &handles[&connection.from_node];
                let downstream_handle = &handles[&downstream.node_id];

                let (reply, waiter) = Reply::new();
                upstream_handle.post(NodeMessage::AttachOutbound {
                    to: downstream.node_id,
                    mailbox: downstream_handle.mailbox(),
                    connection_id: *connection_id,
                    weight: connection.weight,
                    connection_order: connection.connection_order,
                    reply,
                });
                waiter
                    .wait_forever()
                    .ok_or(CortexError::ActorUnresponsive(connection.from_node))?;

                let (reply, waiter) = Reply::new();
                downstream_handle.post(NodeMessage::IncrementBarrierThreshold { reply });
                waiter
                    .wait_forever()
                    .ok_or(CortexError::ActorUnresponsive(downstream.node_id))?;
            }
        }

        info!(
            "cortex constructed for network {network_id}: {} nodes ({} sensors, {} actuators)",
            handles.len(),
            sensors.len(),
            actuators.len()
        );

        Ok(Self {
            handles,
            sensors,
            actuators,
            fired_tracker,
        })
    }

    /// Posts `Sync` to every sensor, then waits up to `timeout` for every
    /// actuator to have fired since.
    pub fn think_and_act(&self, timeout: Duration) -> ThinkOutcome {
        self.fired_tracker.reset();
        for sensor in &self.sensors {
            self.handles[sensor].post(NodeMessage::Sync);
        }
        if self.fired_tracker.wait_until_all(&self.actuators, timeout) {
            ThinkOutcome::ThinkCycleFinished
        } else {
            warn!("think cycle timed out before every actuator fired");
            ThinkOutcome::ThinkCycleIncomplete
        }
    }

    /// Drains every actor back into a [`NodeRecord`](crate::record::NodeRecord)
    /// and terminates its thread, consuming the cortex.
    pub fn kill_cortex(self) -> Result<NodeRecords, CortexError> {
        let mut records = NodeRecords::new();
        for (node_id, handle) in self.handles {
            let (reply, waiter) = Reply::new();
            handle.post(NodeMessage::Drain { reply });
            let record = waiter.wait_forever().ok_or(CortexError::ActorUnresponsive(node_id))?;
            handle.join();
            debug!("node {node_id} drained and terminated");
            records.insert(node_id, record);
        }
        Ok(records)
    }
}

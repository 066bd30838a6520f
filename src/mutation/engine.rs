//! Applies probabilistic structural and parametric edits to a
//! [`NodeRecords`] set. Pure: every function here takes records by
//! reference and returns a freshly edited copy: none of them touch a live
//! substrate.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use cortexevo_utils::{uniform, FunctionId, NodeId};
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::mutation::kinds::{MutationKind, MutationProperties};
use crate::record::{self, InactiveConnection, NodeRecord, NodeRecordType, NodeRecords, RecordError};

/// A cap on how many times [`mutate_one`] resamples a new kind after a
/// precondition fails, so a pathologically unsatisfiable mutation set (every
/// kind's precondition permanently false) cannot spin forever.
const RESAMPLE_ATTEMPTS: usize = 32;

/// Failure modes of the mutation engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MutationError {
    #[error("mutation properties supplied no mutation kinds")]
    NoMutationKinds,
    #[error("cannot mutate an empty record set")]
    EmptyRecords,
    #[error("splicing a new neuron between a sensor and an actuator is invalid")]
    InvalidSensorToActuatorSplice,
    #[error(transparent)]
    InvalidRecords(#[from] RecordError),
}

/// Whether a sampled mutation kind actually changed the records.
enum Attempt {
    Applied(NodeRecords),
    PreconditionUnmet,
}

/// Draws `k = max(1, ceil(u * sqrt(n)))` mutation kinds uniformly with
/// replacement from `properties.mutations` and applies each in turn,
/// validating the result after every edit.
pub fn mutate(
    records: &NodeRecords,
    properties: &MutationProperties,
    rng: &mut impl Rng,
) -> Result<NodeRecords, MutationError> {
    if properties.mutations.is_empty() {
        return Err(MutationError::NoMutationKinds);
    }
    if records.is_empty() {
        return Err(MutationError::EmptyRecords);
    }

    let k = mutation_count(records.len(), rng);
    let mut current = records.clone();
    for _ in 0..k {
        current = mutate_one(&current, properties, rng)?;
    }
    record::validate(&current)?;
    Ok(current)
}

/// `max(1, ceil(u * sqrt(n)))` for `u` uniform in `[0, 1)`.
fn mutation_count(n: usize, rng: &mut impl Rng) -> usize {
    let u: f64 = rng.gen_range(0.0..1.0);
    let k = (u * (n as f64).sqrt()).ceil() as usize;
    k.max(1)
}

/// Samples one mutation kind and applies it, resampling on a failed
/// precondition until either one succeeds, the resample budget is spent, or
/// the set has a single member (in which case an unmet precondition is a
/// no-op, per the single-mutation rule).
fn mutate_one(
    records: &NodeRecords,
    properties: &MutationProperties,
    rng: &mut impl Rng,
) -> Result<NodeRecords, MutationError> {
    for _ in 0..RESAMPLE_ATTEMPTS {
        let kind = *properties
            .mutations
            .choose(rng)
            .expect("non-empty mutation set checked by caller");
        match apply(kind, records, properties, rng)? {
            Attempt::Applied(next) => return Ok(next),
            Attempt::PreconditionUnmet => {
                debug!("mutation {kind:?} precondition unmet, resampling");
                if properties.mutations.len() == 1 {
                    return Ok(records.clone());
                }
            }
        }
    }
    warn!("mutation resample budget exhausted; leaving records unchanged");
    Ok(records.clone())
}

fn neuron_ids(records: &NodeRecords) -> Vec<NodeId> {
    records
        .values()
        .filter(|r| r.node_type.is_neuron())
        .map(|r| r.node_id)
        .collect()
}

fn sensor_ids(records: &NodeRecords) -> Vec<NodeId> {
    records
        .values()
        .filter(|r| r.node_type.is_sensor())
        .map(|r| r.node_id)
        .collect()
}

fn actuator_ids(records: &NodeRecords) -> Vec<NodeId> {
    records
        .values()
        .filter(|r| r.node_type.is_actuator())
        .map(|r| r.node_id)
        .collect()
}

fn non_sensor_ids(records: &NodeRecords) -> Vec<NodeId> {
    records
        .values()
        .filter(|r| !r.node_type.is_sensor())
        .map(|r| r.node_id)
        .collect()
}

fn non_actuator_ids(records: &NodeRecords) -> Vec<NodeId> {
    records
        .values()
        .filter(|r| !r.node_type.is_actuator())
        .map(|r| r.node_id)
        .collect()
}

/// Every `(downstream_id, connection_id)` pair whose connection is sourced
/// from `sensor_id`, across the whole record set.
fn links_from_sensor(records: &NodeRecords, sensor_id: NodeId) -> Vec<(NodeId, Uuid)> {
    let mut links = Vec::new();
    for record in records.values() {
        for (connection_id, connection) in &record.inbound_connections {
            if connection.from_node == sensor_id {
                links.push((record.node_id, *connection_id));
            }
        }
    }
    links
}

/// Reassigns a dense `0..k` `connection_order` to every surviving link from
/// `sensor_id`, in their previous relative order, and syncs the sensor's
/// `outbound_count` to match.
fn renumber_sensor_links(records: &mut NodeRecords, sensor_id: NodeId) {
    let mut links = links_from_sensor(records, sensor_id);
    links.sort_by_key(|(downstream, connection_id)| {
        records[downstream].inbound_connections[connection_id]
            .connection_order
            .unwrap_or(u32::MAX)
    });

    for (order, (downstream, connection_id)) in links.iter().enumerate() {
        records
            .get_mut(downstream)
            .expect("downstream exists")
            .inbound_connections
            .get_mut(connection_id)
            .expect("connection exists")
            .connection_order = Some(order as u32);
    }

    if let Some(NodeRecordType::Sensor { outbound_count }) =
        records.get_mut(&sensor_id).map(|s| &mut s.node_type)
    {
        *outbound_count = links.len() as u32;
    }
}

fn next_node_id(records: &NodeRecords) -> NodeId {
    records.keys().copied().max().map_or(0, |max| max + 1)
}

fn apply(
    kind: MutationKind,
    records: &NodeRecords,
    properties: &MutationProperties,
    rng: &mut impl Rng,
) -> Result<Attempt, MutationError> {
    use MutationKind::*;
    match kind {
        MutateActivationFunction => mutate_activation_function(records, properties, rng),
        AddBias => add_bias(records, rng),
        RemoveBias => remove_bias(records, rng),
        MutateWeights => mutate_weights(records, rng),
        ResetWeights => reset_weights(records, rng),
        AddInboundConnection | AddOutboundConnection => add_connection(records, rng),
        AddNeuron => add_neuron(records, properties, rng),
        AddNeuronOutSplice | AddNeuronInSplice => add_neuron_splice(records, properties, rng),
        AddSensor => add_sensor(records, properties, rng),
        AddActuator => add_actuator(records, properties, rng),
        AddSensorLink => add_sensor_link(records, rng),
        AddActuatorLink => add_actuator_link(records, rng),
        RemoveSensorLink => remove_sensor_link(records, rng),
        RemoveActuatorLink => remove_actuator_link(records, rng),
        RemoveInboundConnection | RemoveOutboundConnection => remove_inbound_connection(records, rng),
        ChangeNeuronLayer => change_neuron_layer(records, rng),
    }
}

fn mutate_activation_function(
    records: &NodeRecords,
    properties: &MutationProperties,
    rng: &mut impl Rng,
) -> Result<Attempt, MutationError> {
    let neurons = neuron_ids(records);
    let Some(&id) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let Some(&activation_id) = properties.activation_ids.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let mut next = records.clone();
    next.get_mut(&id).expect("neuron exists").activation_function_id = Some(activation_id);
    Ok(Attempt::Applied(next))
}

fn add_bias(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let neurons = neuron_ids(records);
    let Some(&id) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let neuron = &records[&id];
    if neuron.bias.is_none() || neuron.bias == Some(0.0) {
        let mut next = records.clone();
        next.get_mut(&id).expect("neuron exists").bias = Some(uniform(rng, 0.0, 1.0));
        Ok(Attempt::Applied(next))
    } else {
        Ok(Attempt::PreconditionUnmet)
    }
}

fn remove_bias(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let neurons = neuron_ids(records);
    let Some(&id) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let neuron = &records[&id];
    if matches!(neuron.bias, Some(b) if b > 0.0) {
        let mut next = records.clone();
        next.get_mut(&id).expect("neuron exists").bias = None;
        Ok(Attempt::Applied(next))
    } else {
        Ok(Attempt::PreconditionUnmet)
    }
}

fn mutate_weights(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let neurons = neuron_ids(records);
    let Some(&id) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let d = records[&id].inbound_connections.len();
    if d == 0 {
        return Ok(Attempt::PreconditionUnmet);
    }
    let flip_probability = 1.0 / (d as f64).sqrt();
    let mut next = records.clone();
    for connection in next
        .get_mut(&id)
        .expect("neuron exists")
        .inbound_connections
        .values_mut()
    {
        if rng.gen_range(0.0..1.0) < flip_probability {
            connection.weight = uniform(rng, -FRAC_PI_2, FRAC_PI_2);
        }
    }
    Ok(Attempt::Applied(next))
}

fn reset_weights(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let neurons = neuron_ids(records);
    let Some(&id) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    if records[&id].inbound_connections.is_empty() {
        return Ok(Attempt::PreconditionUnmet);
    }
    let mut next = records.clone();
    for connection in next
        .get_mut(&id)
        .expect("neuron exists")
        .inbound_connections
        .values_mut()
    {
        connection.weight = uniform(rng, -FRAC_PI_2, FRAC_PI_2);
    }
    Ok(Attempt::Applied(next))
}

/// Shared implementation for `AddInboundConnection`/`AddOutboundConnection`:
/// picks a neuron `F` and a source `T` restricted to neurons, since a
/// sensor source would need `connection_order`/`outbound_count` bookkeeping
/// that `AddSensorLink` owns, and an actuator source is structurally
/// invalid.
fn add_connection(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let neurons = neuron_ids(records);
    let Some(&f) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let Some(&t) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let mut next = records.clone();
    next.get_mut(&f)
        .expect("neuron exists")
        .inbound_connections
        .insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: None,
                from_node: t,
                weight: 1.0,
            },
        );
    Ok(Attempt::Applied(next))
}

fn add_neuron(
    records: &NodeRecords,
    properties: &MutationProperties,
    rng: &mut impl Rng,
) -> Result<Attempt, MutationError> {
    let neurons = neuron_ids(records);
    let Some(&layer_source) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let Some(&activation_id) = properties.activation_ids.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let non_actuator = non_actuator_ids(records);
    let non_sensor = non_sensor_ids(records);
    let Some(&f) = non_actuator.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let Some(&t) = non_sensor.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let mut next = records.clone();
    let new_id = next_node_id(&next);
    let mut neuron = NodeRecord::new_neuron(new_id, next[&layer_source].layer, activation_id);
    neuron.learning_algorithm = properties.learning_algorithm;

    let connection_order = if next[&f].node_type.is_sensor() {
        let count = match next[&f].node_type {
            NodeRecordType::Sensor { outbound_count } => outbound_count,
            _ => unreachable!(),
        };
        if let NodeRecordType::Sensor { outbound_count } = &mut next.get_mut(&f).expect("sensor exists").node_type {
            *outbound_count += 1;
        }
        Some(count)
    } else {
        None
    };
    neuron.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection {
            connection_order,
            from_node: f,
            weight: 1.0,
        },
    );
    next.insert(new_id, neuron);

    next.get_mut(&t)
        .expect("target exists")
        .inbound_connections
        .insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: None,
                from_node: new_id,
                weight: 1.0,
            },
        );

    Ok(Attempt::Applied(next))
}

/// Shared implementation for `AddNeuronOutSplice`/`AddNeuronInSplice`:
/// chooses an existing inbound edge `F -> T` and inserts a fresh neuron `N`
/// so it becomes `F -> N -> T`.
fn add_neuron_splice(
    records: &NodeRecords,
    properties: &MutationProperties,
    rng: &mut impl Rng,
) -> Result<Attempt, MutationError> {
    let non_sensor = non_sensor_ids(records);
    let candidates: Vec<(NodeId, Uuid)> = non_sensor
        .iter()
        .flat_map(|&t| {
            records[&t]
                .inbound_connections
                .keys()
                .map(move |&connection_id| (t, connection_id))
        })
        .collect();
    let Some(&(t, connection_id)) = candidates.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let Some(&activation_id) = properties.activation_ids.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let mut next = records.clone();
    let original = next[&t].inbound_connections[&connection_id];
    let f = original.from_node;
    let f_is_sensor = next[&f].node_type.is_sensor();
    let t_is_actuator = next[&t].node_type.is_actuator();

    if f_is_sensor && t_is_actuator {
        return Err(MutationError::InvalidSensorToActuatorSplice);
    }

    let new_layer = match (f_is_sensor, t_is_actuator) {
        (false, true) => next[&f].layer + 1,
        (false, false) => (next[&f].layer + next[&t].layer) / 2,
        (true, false) => (next[&t].layer + 1) / 2,
        (true, true) => unreachable!("rejected above"),
    };

    let new_id = next_node_id(&next);
    let mut spliced = NodeRecord::new_neuron(new_id, new_layer, activation_id);

    let connection_order = if f_is_sensor {
        let slot = match next[&f].node_type {
            NodeRecordType::Sensor { outbound_count } => outbound_count,
            _ => unreachable!(),
        };
        Some(slot)
    } else {
        None
    };
    spliced.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection {
            connection_order,
            from_node: f,
            weight: original.weight,
        },
    );
    next.insert(new_id, spliced);

    next.get_mut(&t)
        .expect("target exists")
        .inbound_connections
        .get_mut(&connection_id)
        .expect("connection exists")
        .from_node = new_id;
    next.get_mut(&t)
        .expect("target exists")
        .inbound_connections
        .get_mut(&connection_id)
        .expect("connection exists")
        .connection_order = None;

    if f_is_sensor {
        renumber_sensor_links(&mut next, f);
    }

    Ok(Attempt::Applied(next))
}

fn add_sensor(
    records: &NodeRecords,
    properties: &MutationProperties,
    rng: &mut impl Rng,
) -> Result<Attempt, MutationError> {
    let existing_sensors = sensor_ids(records).len();
    if existing_sensors >= properties.sync_ids.len() {
        return Ok(Attempt::PreconditionUnmet);
    }
    let used: Vec<FunctionId> = records
        .values()
        .filter_map(|r| r.sync_function_id)
        .collect();
    let available: Vec<FunctionId> = properties
        .sync_ids
        .iter()
        .copied()
        .filter(|id| !used.contains(id))
        .collect();
    let Some(&sync_id) = available.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let neurons = neuron_ids(records);
    let Some(&target) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let mut next = records.clone();
    let new_id = next_node_id(&next);
    let mut sensor = NodeRecord::new_sensor(new_id, sync_id, Some(1));
    sensor.node_type = NodeRecordType::Sensor { outbound_count: 1 };
    next.insert(new_id, sensor);

    next.get_mut(&target)
        .expect("target exists")
        .inbound_connections
        .insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: Some(0),
                from_node: new_id,
                weight: 1.0,
            },
        );

    Ok(Attempt::Applied(next))
}

fn add_actuator(
    records: &NodeRecords,
    properties: &MutationProperties,
    rng: &mut impl Rng,
) -> Result<Attempt, MutationError> {
    let existing_actuators = actuator_ids(records).len();
    if existing_actuators >= properties.output_hook_ids.len() {
        return Ok(Attempt::PreconditionUnmet);
    }
    let used: Vec<FunctionId> = records
        .values()
        .filter_map(|r| r.output_hook_id)
        .collect();
    let available: Vec<FunctionId> = properties
        .output_hook_ids
        .iter()
        .copied()
        .filter(|id| !used.contains(id))
        .collect();
    let Some(&hook_id) = available.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let neurons = neuron_ids(records);
    let Some(&source) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let mut next = records.clone();
    let new_id = next_node_id(&next);
    let max_layer = next.values().map(|r| r.layer).max().unwrap_or(1);
    let actuator = NodeRecord::new_actuator(new_id, max_layer + 1, hook_id);
    next.insert(new_id, actuator);

    next.get_mut(&new_id)
        .expect("actuator exists")
        .inbound_connections
        .insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: None,
                from_node: source,
                weight: 1.0,
            },
        );

    Ok(Attempt::Applied(next))
}

fn add_sensor_link(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let eligible: Vec<NodeId> = sensor_ids(records)
        .into_iter()
        .filter(|id| match records[id].node_type {
            NodeRecordType::Sensor { outbound_count } => {
                match records[id].maximum_vector_length {
                    Some(0) | None => true,
                    Some(max) => outbound_count < max,
                }
            }
            _ => false,
        })
        .collect();
    let Some(&sensor_id) = eligible.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let neurons = neuron_ids(records);
    let Some(&target) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let mut next = records.clone();
    let slot = match next[&sensor_id].node_type {
        NodeRecordType::Sensor { outbound_count } => outbound_count,
        _ => unreachable!(),
    };
    next.get_mut(&target)
        .expect("target exists")
        .inbound_connections
        .insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: Some(slot),
                from_node: sensor_id,
                weight: 1.0,
            },
        );
    if let NodeRecordType::Sensor { outbound_count } =
        &mut next.get_mut(&sensor_id).expect("sensor exists").node_type
    {
        *outbound_count += 1;
    }

    Ok(Attempt::Applied(next))
}

fn add_actuator_link(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let neurons = neuron_ids(records);
    let actuators = actuator_ids(records);
    let Some(&source) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let Some(&target) = actuators.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let mut next = records.clone();
    next.get_mut(&target)
        .expect("actuator exists")
        .inbound_connections
        .insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: None,
                from_node: source,
                weight: 1.0,
            },
        );
    Ok(Attempt::Applied(next))
}

fn remove_sensor_link(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let eligible: Vec<NodeId> = sensor_ids(records)
        .into_iter()
        .filter(|id| match records[id].node_type {
            NodeRecordType::Sensor { outbound_count } => outbound_count > 1,
            _ => false,
        })
        .collect();
    let Some(&sensor_id) = eligible.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let links = links_from_sensor(records, sensor_id);
    let eligible_links: Vec<(NodeId, Uuid)> = links
        .into_iter()
        .filter(|(downstream, _)| records[downstream].inbound_connections.len() > 1)
        .collect();
    let Some(&(downstream, connection_id)) = eligible_links.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let mut next = records.clone();
    next.get_mut(&downstream)
        .expect("downstream exists")
        .inbound_connections
        .remove(&connection_id);
    renumber_sensor_links(&mut next, sensor_id);

    Ok(Attempt::Applied(next))
}

fn remove_actuator_link(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let eligible: Vec<NodeId> = actuator_ids(records)
        .into_iter()
        .filter(|id| records[id].inbound_connections.len() > 1)
        .collect();
    let Some(&actuator_id) = eligible.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let mut next = records.clone();
    let connection_ids: Vec<Uuid> = next[&actuator_id].inbound_connections.keys().copied().collect();
    let connection_id = *connection_ids
        .choose(rng)
        .expect("non-empty inbound checked above");
    next.get_mut(&actuator_id)
        .expect("actuator exists")
        .inbound_connections
        .remove(&connection_id);
    Ok(Attempt::Applied(next))
}

fn remove_inbound_connection(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let eligible: Vec<NodeId> = neuron_ids(records)
        .into_iter()
        .filter(|id| {
            let record = &records[id];
            record.inbound_connections.len() > 1
                && record
                    .inbound_connections
                    .values()
                    .any(|c| c.connection_order.is_none())
        })
        .collect();
    let Some(&neuron_id) = eligible.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let non_sensor_sourced: Vec<Uuid> = records[&neuron_id]
        .inbound_connections
        .iter()
        .filter(|(_, c)| c.connection_order.is_none())
        .map(|(id, _)| *id)
        .collect();
    let Some(&connection_id) = non_sensor_sourced.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };

    let mut next = records.clone();
    let neuron = next.get_mut(&neuron_id).expect("neuron exists");
    neuron.inbound_connections.remove(&connection_id);
    if neuron.inbound_connections.len() <= 1 {
        return Ok(Attempt::PreconditionUnmet);
    }

    Ok(Attempt::Applied(next))
}

fn change_neuron_layer(records: &NodeRecords, rng: &mut impl Rng) -> Result<Attempt, MutationError> {
    let neurons = neuron_ids(records);
    let Some(&id) = neurons.choose(rng) else {
        return Ok(Attempt::PreconditionUnmet);
    };
    let max_layer = records.values().map(|r| r.layer).max().unwrap_or(1);
    let mut next = records.clone();
    next.get_mut(&id).expect("neuron exists").layer = rng.gen_range(1..=max_layer.max(1) + 1);
    Ok(Attempt::Applied(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn one_neuron_fan_in() -> NodeRecords {
        let mut records = NodeRecords::new();
        let mut sensor = NodeRecord::new_sensor(0, 100, Some(2));
        sensor.node_type = NodeRecordType::Sensor { outbound_count: 2 };

        let mut neuron = NodeRecord::new_neuron(1, 1, 10);
        neuron.inbound_connections.insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: Some(0),
                from_node: 0,
                weight: 2.0,
            },
        );
        neuron.inbound_connections.insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: Some(1),
                from_node: 0,
                weight: 4.0,
            },
        );

        let mut actuator = NodeRecord::new_actuator(2, 2, 200);
        actuator.inbound_connections.insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: None,
                from_node: 1,
                weight: 1.0,
            },
        );

        records.insert(0, sensor);
        records.insert(1, neuron);
        records.insert(2, actuator);
        records
    }

    fn basic_properties() -> MutationProperties {
        MutationProperties {
            mutations: vec![MutationKind::AddNeuron],
            activation_ids: vec![10, 11],
            sync_ids: vec![100],
            output_hook_ids: vec![200],
            learning_algorithm: crate::record::LearningAlgorithm::NoLearning,
        }
    }

    #[test]
    fn add_neuron_preserves_a_sensor_to_actuator_path() {
        let records = one_neuron_fan_in();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let properties = basic_properties();

        let mutated = mutate(&records, &properties, &mut rng).expect("mutation succeeds");
        record::validate(&mutated).expect("invariants hold after AddNeuron");

        assert!(mutated.len() >= records.len());
        let sensors: Vec<NodeId> = mutated
            .values()
            .filter(|r| r.node_type.is_sensor())
            .map(|r| r.node_id)
            .collect();
        let actuators: Vec<NodeId> = mutated
            .values()
            .filter(|r| r.node_type.is_actuator())
            .map(|r| r.node_id)
            .collect();
        assert!(reachable(&mutated, sensors[0], actuators[0]));
    }

    /// Breadth-first search along `from_node` edges, from `source` to
    /// `target`, treating the graph as undirected reachability for the
    /// purpose of this test (an edge F->T in record form means data flows
    /// F to T at runtime).
    fn reachable(records: &NodeRecords, source: NodeId, target: NodeId) -> bool {
        let mut downstream_of: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for record in records.values() {
            for connection in record.inbound_connections.values() {
                downstream_of
                    .entry(connection.from_node)
                    .or_default()
                    .push(record.node_id);
            }
        }
        let mut frontier = vec![source];
        let mut visited = std::collections::HashSet::new();
        while let Some(node) = frontier.pop() {
            if node == target {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(next) = downstream_of.get(&node) {
                frontier.extend(next.iter().copied());
            }
        }
        false
    }

    #[test]
    fn mutate_weights_flips_roughly_one_over_sqrt_d_of_edges() {
        let mut records = NodeRecords::new();
        let mut neuron = NodeRecord::new_neuron(0, 1, 10);
        for i in 0..100 {
            neuron.inbound_connections.insert(
                Uuid::new_v4(),
                InactiveConnection {
                    connection_order: None,
                    from_node: 1000 + i,
                    weight: 1.0,
                },
            );
        }
        records.insert(0, neuron);

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut flips = 0u32;
        let trials = 2000;
        for _ in 0..trials {
            match mutate_weights(&records, &mut rng).unwrap() {
                Attempt::Applied(next) => {
                    flips += next[&0]
                        .inbound_connections
                        .values()
                        .zip(records[&0].inbound_connections.values())
                        .filter(|(a, b)| a.weight != b.weight)
                        .count() as u32;
                }
                Attempt::PreconditionUnmet => panic!("100 inbound connections is never unmet"),
            }
        }
        let empirical = flips as f64 / (trials as f64 * 100.0);
        assert!((empirical - 0.1).abs() < 0.02, "empirical flip rate was {empirical}");
    }

    #[test]
    fn remove_sensor_link_renumbers_survivors_densely() {
        let mut records = NodeRecords::new();
        let mut sensor = NodeRecord::new_sensor(0, 100, None);
        sensor.node_type = NodeRecordType::Sensor { outbound_count: 3 };
        records.insert(0, sensor);

        // A second upstream neuron gives each of the three targets a spare
        // inbound edge, so removing the sensor link never orphans them.
        let spare = NodeRecord::new_neuron(1, 0, 10);
        records.insert(1, spare);

        for i in 0..3u32 {
            let mut neuron = NodeRecord::new_neuron(10 + i as NodeId, 1, 10);
            neuron.inbound_connections.insert(
                Uuid::new_v4(),
                InactiveConnection {
                    connection_order: Some(i),
                    from_node: 0,
                    weight: 1.0,
                },
            );
            neuron.inbound_connections.insert(
                Uuid::new_v4(),
                InactiveConnection {
                    connection_order: None,
                    from_node: 1,
                    weight: 1.0,
                },
            );
            records.insert(10 + i as NodeId, neuron);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let next = match remove_sensor_link(&records, &mut rng).unwrap() {
            Attempt::Applied(next) => next,
            Attempt::PreconditionUnmet => panic!("3 outbound links is always eligible"),
        };

        let mut orders: Vec<u32> = next
            .values()
            .flat_map(|r| r.inbound_connections.values())
            .filter_map(|c| c.connection_order)
            .collect();
        orders.sort_unstable();
        assert_eq!(orders, vec![0, 1]);
        assert!(matches!(
            next[&0].node_type,
            NodeRecordType::Sensor { outbound_count: 2 }
        ));
    }
}

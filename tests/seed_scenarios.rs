//! End-to-end seed scenarios exercising the full construct/think/teardown
//! and evolution paths against a live cortex, matching this crate's own
//! scenario-style integration tests (one file per cluster of behaviour).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use cortexevo::record::{InactiveConnection, NodeRecord, NodeRecordType, NodeRecords};
use cortexevo::tables::{builtin_activations, ActivationFunctions, OutputHookFunctions, SyncFunctionSources};
use cortexevo::{Cortex, ThinkOutcome};

fn one_neuron_fan_in(bias: Option<f64>) -> NodeRecords {
    let mut records = NodeRecords::new();
    let mut sensor = NodeRecord::new_sensor(0, 100, Some(2));
    sensor.node_type = NodeRecordType::Sensor { outbound_count: 2 };

    let mut neuron = NodeRecord::new_neuron(1, 1, builtin_activations::IDENTITY);
    neuron.bias = bias;
    neuron.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection { connection_order: Some(0), from_node: 0, weight: 2.0 },
    );
    neuron.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection { connection_order: Some(1), from_node: 0, weight: 4.0 },
    );

    let mut actuator = NodeRecord::new_actuator(2, 2, 200);
    actuator.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection { connection_order: None, from_node: 1, weight: 1.0 },
    );

    records.insert(0, sensor);
    records.insert(1, neuron);
    records.insert(2, actuator);
    records
}

fn drive_once(records: &NodeRecords) -> f64 {
    let activation_functions: ActivationFunctions = builtin_activations::table();

    let mut sync_sources: SyncFunctionSources = HashMap::new();
    sync_sources.insert(
        100,
        Arc::new(|_network_id| Box::new(|| vec![0.5, 0.25]) as Box<dyn FnMut() -> Vec<f64> + Send>),
    );

    let captured = Arc::new(Mutex::new(None));
    let captured_clone = captured.clone();
    let mut output_hooks: OutputHookFunctions = HashMap::new();
    output_hooks.insert(
        200,
        Arc::new(move |_network_id, value| {
            *captured_clone.lock().unwrap() = Some(value);
        }),
    );

    let cortex = Cortex::construct(records, 0, &activation_functions, &sync_sources, &output_hooks)
        .expect("construction succeeds");
    let outcome = cortex.think_and_act(Duration::from_secs(1));
    assert_eq!(outcome, ThinkOutcome::ThinkCycleFinished);
    let value = captured.lock().unwrap().expect("actuator fired");
    cortex.kill_cortex().expect("teardown succeeds");
    value
}

/// Scenario 1: one-neuron fan-in without bias sums to the weighted dot
/// product of the sensor's two values.
#[test]
fn one_neuron_fan_in_sums_weighted_inputs() {
    let records = one_neuron_fan_in(None);
    assert_eq!(drive_once(&records), 2.0);
}

/// Scenario 2: the same topology with a bias of 1.0 adds it to the sum.
#[test]
fn bias_is_added_after_the_weighted_sum() {
    let records = one_neuron_fan_in(Some(1.0));
    assert_eq!(drive_once(&records), 3.0);
}

/// Construct -> teardown without any think cycle is an identity on node ids
/// and topology when the learning algorithm is NoLearning (no firing ever
/// happens, so nothing could have adjusted a weight).
#[test]
fn construct_then_teardown_without_thinking_is_an_identity() {
    let records = one_neuron_fan_in(Some(0.25));
    let activation_functions = builtin_activations::table();
    let mut sync_sources: SyncFunctionSources = HashMap::new();
    sync_sources.insert(
        100,
        Arc::new(|_network_id| Box::new(|| vec![0.5, 0.25]) as Box<dyn FnMut() -> Vec<f64> + Send>),
    );
    let mut output_hooks: OutputHookFunctions = HashMap::new();
    output_hooks.insert(200, Arc::new(|_network_id, _value| {}));

    let cortex = Cortex::construct(&records, 0, &activation_functions, &sync_sources, &output_hooks)
        .expect("construction succeeds");
    let final_records = cortex.kill_cortex().expect("teardown succeeds");

    assert_eq!(final_records.len(), records.len());
    for (id, original) in &records {
        let after = &final_records[id];
        assert_eq!(after.node_id, original.node_id);
        assert_eq!(after.layer, original.layer);
        assert_eq!(after.node_type, original.node_type);
        assert_eq!(after.bias, original.bias);
        for (connection_id, original_connection) in &original.inbound_connections {
            let after_connection = &after.inbound_connections[connection_id];
            assert_eq!(after_connection.weight, original_connection.weight);
            assert_eq!(after_connection.from_node, original_connection.from_node);
            assert_eq!(after_connection.connection_order, original_connection.connection_order);
        }
    }
}

/// Serialising and deserialising a record set round-trips losslessly.
#[test]
fn record_serialisation_round_trips() {
    let records = one_neuron_fan_in(Some(0.5));
    let json = serde_json::to_string(&records).expect("serialises");
    let restored: NodeRecords = serde_json::from_str(&json).expect("deserialises");

    assert_eq!(restored.len(), records.len());
    for (id, original) in &records {
        let restored_record = &restored[id];
        assert_eq!(restored_record.node_id, original.node_id);
        assert_eq!(restored_record.bias, original.bias);
        assert_eq!(restored_record.inbound_connections.len(), original.inbound_connections.len());
    }
}

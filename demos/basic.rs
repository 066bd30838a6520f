//! Builds a two-sensor, one-neuron, one-actuator network by hand, runs a
//! single think cycle, and prints what the actuator saw.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use cortexevo::record::{InactiveConnection, NodeRecord, NodeRecordType, NodeRecords};
use cortexevo::tables::{builtin_activations, ActivationFunctions, OutputHookFunctions, SyncFunctionSources};
use cortexevo::Cortex;
use cortexevo_utils::NodeIdGenerator;

const SYNC_ID: u64 = 0;
const HOOK_ID: u64 = 0;

fn main() {
    env_logger::init();

    // A fresh network built from scratch (as opposed to one produced by the
    // mutation engine, which derives its own ids from the record set it is
    // editing) draws its node ids from the process-wide generator.
    let ids = NodeIdGenerator::starting_at(0);
    let mut records = NodeRecords::new();
    let sensor_id = ids.next();
    let neuron_id = ids.next();
    let actuator_id = ids.next();

    let mut sensor = NodeRecord::new_sensor(sensor_id, SYNC_ID, Some(2));
    sensor.node_type = NodeRecordType::Sensor { outbound_count: 2 };

    let mut neuron = NodeRecord::new_neuron(neuron_id, 1, builtin_activations::IDENTITY);
    neuron.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection {
            connection_order: Some(0),
            from_node: sensor_id,
            weight: 0.5,
        },
    );
    neuron.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection {
            connection_order: Some(1),
            from_node: sensor_id,
            weight: -0.5,
        },
    );

    let mut actuator = NodeRecord::new_actuator(actuator_id, 2, HOOK_ID);
    actuator.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection {
            connection_order: None,
            from_node: neuron_id,
            weight: 1.0,
        },
    );

    records.insert(sensor_id, sensor);
    records.insert(neuron_id, neuron);
    records.insert(actuator_id, actuator);

    let activation_functions: ActivationFunctions = builtin_activations::table();

    let mut sync_function_sources: SyncFunctionSources = HashMap::new();
    sync_function_sources.insert(
        SYNC_ID,
        Arc::new(|_network_id| Box::new(|| vec![1.0, 2.0]) as Box<dyn FnMut() -> Vec<f64> + Send>),
    );

    let seen = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();
    let mut output_hook_functions: OutputHookFunctions = HashMap::new();
    output_hook_functions.insert(
        HOOK_ID,
        Arc::new(move |_network_id, value| {
            *seen_clone.lock().unwrap() = Some(value);
        }),
    );

    let cortex = Cortex::construct(
        &records,
        0,
        &activation_functions,
        &sync_function_sources,
        &output_hook_functions,
    )
    .expect("construction succeeds");

    cortex.think_and_act(Duration::from_millis(500));
    println!("actuator saw: {:?}", *seen.lock().unwrap());

    let final_records = cortex.kill_cortex().expect("teardown succeeds");
    println!("{} nodes survived teardown", final_records.len());
}

//! Evolves a small sensor/hidden/actuator network toward XOR by mutating
//! weights and activation functions over several generations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use cortexevo::record::{InactiveConnection, NodeRecord, NodeRecordType, NodeRecords};
use cortexevo::tables::{builtin_activations, FitnessFn, GenerationDirective, OutputHookFunctions, SyncFunctionSources};
use cortexevo::{evolve_for_generations, EvolutionProperties, MutationKind, MutationProperties};

const SYNC_ID: u64 = 0;
const HOOK_ID: u64 = 0;

const TRUTH_TABLE: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

fn seed_records() -> NodeRecords {
    let mut records = NodeRecords::new();

    let mut sensor = NodeRecord::new_sensor(0, SYNC_ID, Some(4));
    sensor.node_type = NodeRecordType::Sensor { outbound_count: 4 };

    let mut h1 = NodeRecord::new_neuron(1, 1, builtin_activations::SIGMOID);
    h1.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection { connection_order: Some(0), from_node: 0, weight: 0.5 },
    );
    h1.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection { connection_order: Some(1), from_node: 0, weight: -0.5 },
    );

    let mut h2 = NodeRecord::new_neuron(2, 1, builtin_activations::SIGMOID);
    h2.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection { connection_order: Some(2), from_node: 0, weight: -0.5 },
    );
    h2.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection { connection_order: Some(3), from_node: 0, weight: 0.5 },
    );

    let mut output = NodeRecord::new_actuator(3, 2, HOOK_ID);
    output.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection { connection_order: None, from_node: 1, weight: 0.5 },
    );
    output.inbound_connections.insert(
        Uuid::new_v4(),
        InactiveConnection { connection_order: None, from_node: 2, weight: 0.5 },
    );

    records.insert(0, sensor);
    records.insert(1, h1);
    records.insert(2, h2);
    records.insert(3, output);
    records
}

fn main() {
    env_logger::init();

    // Row index per network: written by that network's sync source just
    // before it hands the sensor its inputs, read back by the fitness
    // function to know which truth-table row the just-finished cycle used.
    let last_row: Arc<Mutex<HashMap<u64, usize>>> = Arc::new(Mutex::new(HashMap::new()));

    let mut sync_function_sources: SyncFunctionSources = HashMap::new();
    let last_row_for_sync = last_row.clone();
    sync_function_sources.insert(
        SYNC_ID,
        Arc::new(move |network_id| {
            let last_row = last_row_for_sync.clone();
            let mut counter = 0usize;
            Box::new(move || {
                let row = counter % TRUTH_TABLE.len();
                last_row.lock().unwrap().insert(network_id, row);
                counter += 1;
                TRUTH_TABLE[row].0.to_vec()
            }) as Box<dyn FnMut() -> Vec<f64> + Send>
        }),
    );

    let mut output_hook_functions: OutputHookFunctions = HashMap::new();
    output_hook_functions.insert(HOOK_ID, Arc::new(|_network_id, _value| {}));

    let fitness: FitnessFn = Arc::new(move |network_id, buffer: &HashMap<u64, f64>| {
        let row = last_row.lock().unwrap().get(&network_id).copied().unwrap_or(0);
        let expected = TRUTH_TABLE[row].1;
        let actual = buffer.get(&HOOK_ID).copied().unwrap_or(0.0);
        let error = expected - actual;
        (-(error * error), GenerationDirective::ContinueGeneration)
    });

    let properties = EvolutionProperties {
        maximum_minds: 12,
        maximum_think_cycles: TRUTH_TABLE.len() as u32,
        generations: 30,
        divide_population_by: 2,
        think_timeout_ms: 200,
        asynchronous_scoring: true,
        mutation_properties: MutationProperties {
            mutations: vec![
                MutationKind::MutateWeights,
                MutationKind::MutateWeights,
                MutationKind::MutateActivationFunction,
                MutationKind::AddBias,
            ],
            activation_ids: vec![
                builtin_activations::SIGMOID,
                builtin_activations::TANH,
                builtin_activations::RELU,
            ],
            sync_ids: vec![SYNC_ID],
            output_hook_ids: vec![HOOK_ID],
            learning_algorithm: cortexevo::LearningAlgorithm::NoLearning,
        },
        activation_functions: builtin_activations::table(),
        sync_function_sources,
        output_hook_functions,
        fitness,
        starting_records: seed_records(),
        end_of_generation_function: Some(Arc::new(|scored| {
            if let Some((network_id, (score, _))) = scored.first() {
                println!("best network {network_id} scored {score:.4}");
            }
        })),
    };

    let mut rng = rand::thread_rng();
    let result = evolve_for_generations(&properties, &mut rng).expect("evolution succeeds");

    let (network_id, (score, _)) = &result[0];
    println!("final generation winner: network {network_id} with score {score:.4}");
}

//! The generation scheduler: runs `evolve → materialise → drive → score →
//! teardown → select` once per generation, driving any number of networks
//! concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use rand::Rng;
use rayon::prelude::*;
use thiserror::Error;

use cortexevo_utils::{FunctionId, NetworkId};

use crate::cortex::{Cortex, CortexError};
use crate::mutation::{self, MutationError, MutationProperties};
use crate::record::NodeRecords;
use crate::score_keeper::ScoreKeeper;
use crate::tables::{
    ActivationFunctions, FitnessFn, GenerationDirective, OutputHookFunctions, SyncFunctionSources,
};

/// Failure modes of a whole `evolve_for_generations` call.
#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error(transparent)]
    Cortex(#[from] CortexError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// One generation's scored result: `(NetworkId, (score, NodeRecords))`,
/// sorted descending by score.
pub type ScoredNodeRecords = Vec<(NetworkId, (f64, NodeRecords))>;

/// Everything `evolve_for_generations` needs: population shape, think-cycle
/// budget, the mutation set, the caller's function tables, and the fitness
/// function. Plain data, built with ordinary field construction.
#[derive(Clone)]
pub struct EvolutionProperties {
    pub maximum_minds: usize,
    pub maximum_think_cycles: u32,
    pub generations: u32,
    pub divide_population_by: u32,
    pub think_timeout_ms: u64,
    pub asynchronous_scoring: bool,
    pub mutation_properties: MutationProperties,
    pub activation_functions: ActivationFunctions,
    pub sync_function_sources: SyncFunctionSources,
    pub output_hook_functions: OutputHookFunctions,
    pub fitness: FitnessFn,
    pub starting_records: NodeRecords,
    /// Invoked after teardown with each generation's scored records, before
    /// selection.
    pub end_of_generation_function: Option<Arc<dyn Fn(&ScoredNodeRecords) + Send + Sync>>,
}

impl Default for EvolutionProperties {
    /// Conservative values: a small population, few generations, sequential
    /// scoring. The function tables and fitness default to empty/no-op
    /// stand-ins; a caller overrides them before running an evolution.
    fn default() -> Self {
        Self {
            maximum_minds: 8,
            maximum_think_cycles: 10,
            generations: 5,
            divide_population_by: 2,
            think_timeout_ms: 50,
            asynchronous_scoring: false,
            mutation_properties: MutationProperties {
                mutations: Vec::new(),
                activation_ids: Vec::new(),
                sync_ids: Vec::new(),
                output_hook_ids: Vec::new(),
                learning_algorithm: crate::record::LearningAlgorithm::NoLearning,
            },
            activation_functions: HashMap::new(),
            sync_function_sources: HashMap::new(),
            output_hook_functions: HashMap::new(),
            fitness: Arc::new(|_network_id, _buffer| (0.0, GenerationDirective::EndGeneration)),
            starting_records: NodeRecords::new(),
            end_of_generation_function: None,
        }
    }
}

/// Wraps every raw output hook so it also reports its value to the score
/// keeper's `Gather` message, after calling the caller's own hook.
fn wrap_output_hooks(raw: &OutputHookFunctions, gather: Arc<dyn Fn(FunctionId, f64) + Send + Sync>) -> OutputHookFunctions {
    raw.iter()
        .map(|(&hook_id, hook)| {
            let hook = hook.clone();
            let gather = gather.clone();
            let wrapped: Arc<dyn Fn(NetworkId, f64) + Send + Sync> = Arc::new(move |network_id, value| {
                hook(network_id, value);
                gather(hook_id, value);
            });
            (hook_id, wrapped)
        })
        .collect()
}

/// Runs `properties.generations` generations of evolve/materialise/drive/
/// score/teardown/select, starting the first generation's survivor pool
/// from `properties.starting_records` alone. Returns the final generation's
/// retained, score-sorted block.
pub fn evolve_for_generations(
    properties: &EvolutionProperties,
    rng: &mut impl Rng,
) -> Result<ScoredNodeRecords, EvolutionError> {
    let timeout = Duration::from_millis(properties.think_timeout_ms);
    let mut survivors: Vec<NodeRecords> = vec![properties.starting_records.clone()];
    let mut retained: ScoredNodeRecords = Vec::new();

    for generation_counter in 0..properties.generations {
        // 1. Evolve: rotate the survivor pool across maximum_minds slots.
        let mut generation: Vec<(NetworkId, NodeRecords)> = Vec::with_capacity(properties.maximum_minds);
        for slot in 0..properties.maximum_minds {
            let base = &survivors[slot % survivors.len()];
            let mutated = mutation::mutate(base, &properties.mutation_properties, rng)?;
            generation.push((slot as NetworkId, mutated));
        }

        // 2. Materialise: one cortex and score keeper per network.
        let mut cortices = Vec::with_capacity(generation.len());
        for (network_id, records) in &generation {
            let score_keeper = ScoreKeeper::spawn(*network_id, properties.fitness.clone());
            let gather: Arc<dyn Fn(FunctionId, f64) + Send + Sync> = Arc::new(score_keeper.gather_hook());
            let wrapped_hooks = wrap_output_hooks(&properties.output_hook_functions, gather);
            let cortex = Cortex::construct(
                records,
                *network_id,
                &properties.activation_functions,
                &properties.sync_function_sources,
                &wrapped_hooks,
            )?;
            cortices.push((*network_id, cortex, score_keeper));
        }

        // 3 & 4. Drive think cycles and accumulate per-network scores.
        let mut scores: HashMap<NetworkId, f64> = HashMap::new();
        for _cycle in 0..properties.maximum_think_cycles {
            if properties.asynchronous_scoring {
                cortices
                    .par_iter()
                    .for_each(|(_, cortex, _)| {
                        cortex.think_and_act(timeout);
                    });
            } else {
                for (_, cortex, _) in &cortices {
                    cortex.think_and_act(timeout);
                }
            }

            let mut end_generation = false;
            for (network_id, _cortex, score_keeper) in &cortices {
                let (score, directive) = score_keeper.get_score();
                *scores.entry(*network_id).or_insert(0.0) += score;
                if directive == GenerationDirective::EndGeneration {
                    end_generation = true;
                }
            }
            if end_generation {
                debug!("generation {generation_counter} ended early on a fitness directive");
                break;
            }
        }

        // 5. Tear down.
        let mut scored_records: ScoredNodeRecords = Vec::with_capacity(cortices.len());
        for (network_id, cortex, score_keeper) in cortices {
            let final_records = cortex.kill_cortex()?;
            score_keeper.kill();
            let score = scores.get(&network_id).copied().unwrap_or(0.0);
            scored_records.push((network_id, (score, final_records)));
        }

        // 6. End-of-generation hook.
        if let Some(hook) = &properties.end_of_generation_function {
            hook(&scored_records);
        }

        // 7. Select: sort descending, keep the first chunk.
        scored_records.sort_by(|a, b| b.1 .0.partial_cmp(&a.1 .0).unwrap_or(std::cmp::Ordering::Equal));
        let chunk_size = (scored_records.len() as f64 / properties.divide_population_by.max(1) as f64)
            .ceil()
            .max(2.0) as usize;
        scored_records.truncate(chunk_size.min(scored_records.len()).max(1));

        survivors = scored_records.iter().map(|(_, (_, records))| records.clone()).collect();
        info!(
            "generation {generation_counter} complete: {} survivors retained",
            survivors.len()
        );
        retained = scored_records;
    }

    Ok(retained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::MutationKind;
    use crate::record::{InactiveConnection, NodeRecord, NodeRecordType};
    use crate::tables::builtin_activations;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn one_neuron_fan_in() -> NodeRecords {
        let mut records = NodeRecords::new();
        let mut sensor = NodeRecord::new_sensor(0, 100, Some(2));
        sensor.node_type = NodeRecordType::Sensor { outbound_count: 2 };

        let mut neuron = NodeRecord::new_neuron(1, 1, builtin_activations::IDENTITY);
        neuron.inbound_connections.insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: Some(0),
                from_node: 0,
                weight: 1.0,
            },
        );
        neuron.inbound_connections.insert(
            Uuid::new_v4(),
            InactiveConnection {
                connection_order: Some(1),
                from_node: 0,
                weight: 1.0,
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

    #[test]
    fn selection_retains_exactly_half_the_population_descending_by_score() {
        let captured_scores = Arc::new(Mutex::new(Vec::new()));
        let captured = captured_scores.clone();
        let fitness: FitnessFn = Arc::new(move |network_id, buffer: &HashMap<FunctionId, f64>| {
            let value = buffer.values().sum::<f64>() + network_id as f64;
            captured.lock().unwrap().push(value);
            (value, GenerationDirective::EndGeneration)
        });

        let mut sync_sources: SyncFunctionSources = HashMap::new();
        sync_sources.insert(
            100,
            Arc::new(|_network_id: NetworkId| {
                Box::new(|| vec![0.5, 0.25]) as Box<dyn FnMut() -> Vec<f64> + Send>
            }),
        );

        let mut output_hooks: OutputHookFunctions = HashMap::new();
        output_hooks.insert(200, Arc::new(|_network_id: NetworkId, _value: f64| {}));

        let properties = EvolutionProperties {
            maximum_minds: 8,
            maximum_think_cycles: 1,
            generations: 1,
            divide_population_by: 2,
            think_timeout_ms: 500,
            asynchronous_scoring: false,
            mutation_properties: MutationProperties {
                mutations: vec![MutationKind::MutateWeights],
                activation_ids: vec![builtin_activations::IDENTITY],
                sync_ids: vec![100],
                output_hook_ids: vec![200],
                learning_algorithm: crate::record::LearningAlgorithm::NoLearning,
            },
            activation_functions: builtin_activations::table(),
            sync_function_sources: sync_sources,
            output_hook_functions: output_hooks,
            fitness,
            starting_records: one_neuron_fan_in(),
            end_of_generation_function: None,
        };

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let result = evolve_for_generations(&properties, &mut rng).expect("evolution succeeds");

        assert_eq!(result.len(), 4);
        for window in result.windows(2) {
            assert!(window[0].1 .0 >= window[1].1 .0);
        }
    }
}

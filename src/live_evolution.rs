//! The sequential, single-live-cortex alternative to [`crate::scheduler`]
//! for online tasks: only one network is ever running at a time. A caller
//! pumps [`LiveEvolution::synchronize_active_cortex`] to drive one think
//! cycle at a time, and calls [`LiveEvolution::end_evolution`] to stop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use rand::Rng;

use cortexevo_utils::NetworkId;

use crate::cortex::Cortex;
use crate::mutation;
use crate::mutation::MutationProperties;
use crate::record::NodeRecords;
use crate::score_keeper::ScoreKeeper;
use crate::scheduler::{EvolutionError, ScoredNodeRecords};
use crate::tables::{ActivationFunctions, FitnessFn, GenerationDirective, OutputHookFunctions, SyncFunctionSources};

/// Selects the records that seed the next generation from the buffer of
/// fully-scored networks just completed.
pub type FitPopulationSelector = Arc<dyn Fn(&ScoredNodeRecords) -> Vec<NodeRecords> + Send + Sync>;

/// Configuration for [`LiveEvolution`], the single-cortex counterpart of
/// [`crate::scheduler::EvolutionProperties`].
#[derive(Clone)]
pub struct LiveEvolutionProperties {
    pub maximum_think_cycles: u32,
    pub think_timeout_ms: u64,
    /// How many networks make up one generation before the fit-population
    /// selector is invoked.
    pub generation_size: usize,
    pub mutation_properties: MutationProperties,
    pub activation_functions: ActivationFunctions,
    pub sync_function_sources: SyncFunctionSources,
    pub output_hook_functions: OutputHookFunctions,
    pub fitness: FitnessFn,
    pub starting_records: NodeRecords,
    pub fit_population_selector: FitPopulationSelector,
}

struct ActiveCortex {
    network_id: NetworkId,
    cortex: Cortex,
    score_keeper: ScoreKeeper,
    score_sum: f64,
    cycles: u32,
}

/// Drives one network at a time: `synchronize_active_cortex` advances the
/// currently active cortex by one think cycle, starting the next queued
/// network and running the fit-population selector whenever a generation's
/// worth of networks has been scored.
pub struct LiveEvolution<R: Rng> {
    properties: LiveEvolutionProperties,
    rng: R,
    queue: VecDeque<(NetworkId, NodeRecords)>,
    active: Option<ActiveCortex>,
    scored_buffer: ScoredNodeRecords,
    next_network_id: NetworkId,
}

impl<R: Rng> LiveEvolution<R> {
    /// Seeds the run queue by mutating `properties.starting_records`
    /// `generation_size` times, matching the scheduler's own "Evolve" step.
    pub fn new(properties: LiveEvolutionProperties, mut rng: R) -> Result<Self, EvolutionError> {
        let mut queue = VecDeque::with_capacity(properties.generation_size);
        let mut next_network_id: NetworkId = 0;
        for _ in 0..properties.generation_size {
            let mutated = mutation::mutate(
                &properties.starting_records,
                &properties.mutation_properties,
                &mut rng,
            )?;
            queue.push_back((next_network_id, mutated));
            next_network_id += 1;
        }

        Ok(Self {
            properties,
            rng,
            queue,
            active: None,
            scored_buffer: Vec::new(),
            next_network_id,
        })
    }

    fn start_next_cortex(&mut self) -> Result<(), EvolutionError> {
        let Some((network_id, records)) = self.queue.pop_front() else {
            return Ok(());
        };
        let score_keeper = ScoreKeeper::spawn(network_id, self.properties.fitness.clone());
        let gather = score_keeper.gather_hook();
        let hooks = wrap_output_hooks(&self.properties.output_hook_functions, Arc::new(gather));
        let cortex = Cortex::construct(
            &records,
            network_id,
            &self.properties.activation_functions,
            &self.properties.sync_function_sources,
            &hooks,
        )?;
        self.active = Some(ActiveCortex {
            network_id,
            cortex,
            score_keeper,
            score_sum: 0.0,
            cycles: 0,
        });
        Ok(())
    }

    fn finish_active(&mut self) -> Result<(), EvolutionError> {
        let active = self.active.take().expect("finish_active called with an active cortex");
        let final_records = active.cortex.kill_cortex()?;
        active.score_keeper.kill();
        self.scored_buffer
            .push((active.network_id, (active.score_sum, final_records)));

        if self.scored_buffer.len() >= self.properties.generation_size {
            let next_generation = (self.properties.fit_population_selector)(&self.scored_buffer);
            self.scored_buffer.clear();
            for base in &next_generation {
                let mutated = mutation::mutate(base, &self.properties.mutation_properties, &mut self.rng)?;
                self.queue.push_back((self.next_network_id, mutated));
                self.next_network_id += 1;
            }
            info!("live evolution: new generation of {} networks queued", self.queue.len());
        }
        Ok(())
    }

    /// Drives the active cortex through one `ThinkAndAct`, accumulating its
    /// score. Starts the next queued network if none is active. Tears the
    /// network down once its fitness directive ends the think cycle or the
    /// cycle cap is reached, and runs the fit-population selector once a
    /// whole generation has been scored.
    pub fn synchronize_active_cortex(&mut self) -> Result<(), EvolutionError> {
        if self.active.is_none() {
            self.start_next_cortex()?;
        }
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        let timeout = Duration::from_millis(self.properties.think_timeout_ms);
        active.cortex.think_and_act(timeout);
        let (score, directive) = active.score_keeper.get_score();
        active.score_sum += score;
        active.cycles += 1;

        let end_think_cycle = directive == GenerationDirective::EndGeneration
            || active.cycles >= self.properties.maximum_think_cycles;

        if end_think_cycle {
            self.finish_active()?;
        }
        Ok(())
    }

    /// Kills whatever cortex is currently active (crediting it with its
    /// accumulated score), and returns every scored network seen so far.
    pub fn end_evolution(mut self) -> Result<ScoredNodeRecords, EvolutionError> {
        if self.active.is_some() {
            self.finish_active()?;
        }
        Ok(self.scored_buffer)
    }
}

fn wrap_output_hooks(
    raw: &OutputHookFunctions,
    gather: Arc<dyn Fn(cortexevo_utils::FunctionId, f64) + Send + Sync>,
) -> OutputHookFunctions {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::MutationKind;
    use crate::record::{InactiveConnection, NodeRecord, NodeRecordType};
    use crate::tables::builtin_activations;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;
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
    fn drives_a_generation_sequentially_and_selects_survivors() {
        let mut sync_sources: SyncFunctionSources = HashMap::new();
        sync_sources.insert(
            100,
            Arc::new(|_network_id: NetworkId| {
                Box::new(|| vec![0.5, 0.25]) as Box<dyn FnMut() -> Vec<f64> + Send>
            }),
        );

        let mut output_hooks: OutputHookFunctions = HashMap::new();
        output_hooks.insert(200, Arc::new(|_network_id: NetworkId, _value: f64| {}));

        let fitness: FitnessFn = Arc::new(|_network_id, buffer: &HashMap<cortexevo_utils::FunctionId, f64>| {
            (buffer.values().sum(), GenerationDirective::EndGeneration)
        });

        let selected = Arc::new(Mutex::new(0usize));
        let selected_clone = selected.clone();
        let selector: FitPopulationSelector = Arc::new(move |scored: &ScoredNodeRecords| {
            *selected_clone.lock().unwrap() += 1;
            scored.iter().map(|(_, (_, records))| records.clone()).collect()
        });

        let properties = LiveEvolutionProperties {
            maximum_think_cycles: 1,
            think_timeout_ms: 500,
            generation_size: 3,
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
            fit_population_selector: selector,
        };

        let rng = ChaCha8Rng::seed_from_u64(5);
        let mut evolution = LiveEvolution::new(properties, rng).expect("queue seeds");

        for _ in 0..3 {
            evolution.synchronize_active_cortex().expect("cycle runs");
        }
        assert_eq!(*selected.lock().unwrap(), 1);

        let final_scores = evolution.end_evolution().expect("teardown succeeds");
        assert!(final_scores.is_empty());
    }
}

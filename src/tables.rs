//! Caller-supplied function tables and the fitness interface.
//!
//! Activation functions, sync (sensor-input) functions, and output hooks are
//! opaque-id-keyed tables rather than fields baked into records, so a
//! [`NodeRecord`](crate::record::NodeRecord) stays plain data and the
//! code-shaped dependencies live entirely on the caller's side.

use std::collections::HashMap;
use std::sync::Arc;

use cortexevo_utils::FunctionId;

pub use cortexevo_utils::NetworkId;

/// `id -> (f64 -> f64)`. Looked up once per firing by a live neuron.
pub type ActivationFunctions = HashMap<FunctionId, Arc<dyn Fn(f64) -> f64 + Send + Sync>>;

/// `id -> (NetworkId -> () -> Vec<f64>)`. Each source is itself a factory:
/// given a network id it returns the closure a sensor actually calls on
/// every `Sync`, which is how two networks reading the "same" sensor id can
/// still be bound to independent per-network data (e.g. two rollouts of the
/// same simulation).
pub type SyncFunctionSources =
    HashMap<FunctionId, Arc<dyn Fn(NetworkId) -> Box<dyn FnMut() -> Vec<f64> + Send> + Send + Sync>>;

/// `id -> (NetworkId -> (f64) -> ())`. At materialisation time the scheduler
/// wraps the id into a closure that calls the score keeper's `Gather`
/// message; this table is what tells it which raw hook function to wrap.
pub type OutputHookFunctions =
    HashMap<FunctionId, Arc<dyn Fn(NetworkId, f64) + Send + Sync>>;

/// What a fitness function asks the scheduler to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationDirective {
    ContinueGeneration,
    EndGeneration,
}

/// `(NetworkId, actuator-output-by-hook-id) -> (score, directive)`.
pub type FitnessFn =
    Arc<dyn Fn(NetworkId, &HashMap<FunctionId, f64>) -> (f64, GenerationDirective) + Send + Sync>;

/// A small built-in table of common activation functions, provided so
/// callers and tests are not forced to hand-roll `Arc::new(|x| ...)` for the
/// usual suspects. Not exhaustive; callers are free to register their own
/// ids in a table built independently of this one.
pub mod builtin_activations {
    use super::*;

    pub const IDENTITY: FunctionId = 0;
    pub const SIGMOID: FunctionId = 1;
    pub const RELU: FunctionId = 2;
    pub const TANH: FunctionId = 3;

    /// Builds a table containing [`IDENTITY`], [`SIGMOID`], [`RELU`], and
    /// [`TANH`], keyed by the constants above.
    pub fn table() -> ActivationFunctions {
        let mut table: ActivationFunctions = HashMap::new();
        table.insert(IDENTITY, Arc::new(|x| x));
        table.insert(SIGMOID, Arc::new(|x| 1.0 / (1.0 + (-x).exp())));
        table.insert(RELU, Arc::new(|x| x.max(0.0)));
        table.insert(TANH, Arc::new(|x| x.tanh()));
        table
    }
}

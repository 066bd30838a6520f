//! A neuroevolution engine: mutates network topologies described as plain
//! [`record::NodeRecords`] and drives them as live actor graphs.
//!
//! The typical flow is: build a seed [`record::NodeRecords`] by hand (or
//! load one from `serde_json`), hand it to [`scheduler::evolve_for_generations`]
//! along with [`tables`] of activation/sync/output-hook functions and a
//! fitness function, and get back the final generation's
//! [`scheduler::ScoredNodeRecords`]. For online tasks where only one network
//! should run at a time, use [`live_evolution::LiveEvolution`] instead.

pub mod cortex;
pub mod live_evolution;
pub mod mutation;
pub mod record;
pub mod score_keeper;
pub mod scheduler;
pub mod substrate;
pub mod tables;

pub use cortex::{Cortex, CortexError, ThinkOutcome};
pub use live_evolution::{LiveEvolution, LiveEvolutionProperties};
pub use mutation::{mutate, MutationError, MutationKind, MutationProperties};
pub use record::{
    ConnectionId, InactiveConnection, LearningAlgorithm, NodeRecord, NodeRecordType, NodeRecords, RecordError,
};
pub use score_keeper::ScoreKeeper;
pub use scheduler::{evolve_for_generations, EvolutionError, EvolutionProperties, ScoredNodeRecords};
pub use tables::{
    builtin_activations, ActivationFunctions, FitnessFn, GenerationDirective, NetworkId, OutputHookFunctions,
    SyncFunctionSources,
};

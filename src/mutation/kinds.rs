use cortexevo_utils::FunctionId;

use crate::record::LearningAlgorithm;

/// One structural or parametric edit the mutation engine knows how to apply
/// to a [`NodeRecords`](crate::record::NodeRecords) set.
///
/// `AddInboundConnection`/`AddOutboundConnection` and
/// `AddNeuronOutSplice`/`AddNeuronInSplice` are pairs that share one
/// implementation; they are kept as distinct variants purely so a caller can
/// tune their relative sampling weight by how many times each name appears
/// in a [`MutationProperties::mutations`] sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    MutateActivationFunction,
    AddBias,
    RemoveBias,
    MutateWeights,
    ResetWeights,
    AddInboundConnection,
    AddOutboundConnection,
    AddNeuron,
    AddNeuronOutSplice,
    AddNeuronInSplice,
    AddSensor,
    AddActuator,
    AddSensorLink,
    AddActuatorLink,
    RemoveSensorLink,
    RemoveActuatorLink,
    RemoveInboundConnection,
    RemoveOutboundConnection,
    ChangeNeuronLayer,
}

/// Everything the mutation engine needs for one call to
/// [`crate::mutation::mutate`]: the candidate kinds to sample from, the ids
/// available for newly created nodes, and the records to edit.
#[derive(Debug, Clone)]
pub struct MutationProperties {
    /// Mutation kinds eligible for sampling. Repeating a kind increases its
    /// relative weight.
    pub mutations: Vec<MutationKind>,
    /// Activation function ids a new or re-rolled neuron may be assigned.
    pub activation_ids: Vec<FunctionId>,
    /// Sync function ids available to `AddSensor`.
    pub sync_ids: Vec<FunctionId>,
    /// Output hook ids available to `AddActuator`.
    pub output_hook_ids: Vec<FunctionId>,
    /// Learning algorithm assigned to any newly created neuron.
    pub learning_algorithm: LearningAlgorithm,
}

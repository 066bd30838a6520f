//! Shared identifier and randomness utilities for the cortexevo workspace.

mod ids;

pub use ids::{NetworkId, NodeIdGenerator};

/// Process-unique, monotonically allocated identifier for a live or recorded
/// node. Persists across the record <-> live conversion.
pub type NodeId = u64;

/// Opaque identifier into a caller-supplied activation, sync, or output-hook
/// function table. Kept distinct from [`NodeId`] even though both are
/// integers, so a record field can never be accidentally compared against
/// the wrong kind of id.
pub type FunctionId = u64;

/// Draws a uniformly distributed `f64` in `[low, high)` using the supplied
/// RNG. A thin wrapper kept here so every mutation in the engine samples the
/// same way rather than each reaching for `rand::Rng::gen_range` slightly
/// differently.
pub fn uniform<R: rand::Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    rng.gen_range(low..high)
}

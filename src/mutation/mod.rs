//! The probabilistic topology and weight mutation engine: pure edits over a
//! [`NodeRecords`](crate::record::NodeRecords) set, independent of any live
//! substrate.

mod engine;
mod kinds;

pub use engine::{mutate, MutationError};
pub use kinds::{MutationKind, MutationProperties};

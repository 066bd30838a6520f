//! The live neural substrate: sensor, neuron, and actuator actors that
//! cooperatively compute one activation wave per `Sync`. See
//! [`crate::cortex`] for the coordinator that constructs, drives, and tears
//! these down.

mod actuator;
mod common;
mod message;
mod neuron;
mod sensor;

pub use actuator::spawn_actuator;
pub use common::{weighted_sum, Barrier, FiredTracker, OutboundEdge};
pub use message::NodeMessage;
pub use neuron::spawn_neuron;
pub use sensor::spawn_sensor;

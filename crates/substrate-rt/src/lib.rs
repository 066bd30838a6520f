//! Actor mailbox primitives used by the live neural substrate.
//!
//! Every node in a live network (sensor, neuron, actuator), every cortex
//! coordinator, and every score keeper is realised as an independent actor: a
//! value living on its own OS thread, reachable only by sending it messages
//! through a [`crossbeam_channel`] mailbox. This crate provides the generic
//! plumbing ([`Mailbox`], [`spawn_actor`], [`Reply`]) that the rest of the
//! workspace specialises into concrete node and coordinator behaviours.

mod mailbox;
mod reply;

pub use mailbox::{spawn_actor, ActorHandle, Mailbox};
pub use reply::Reply;

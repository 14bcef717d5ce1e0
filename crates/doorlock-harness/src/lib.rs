//! Deterministic simulation harness for the door-lock protocol.
//!
//! Runs an [`HmiNode`](doorlock_core::HmiNode) and a
//! [`ControlNode`](doorlock_core::ControlNode) against each other over
//! seeded, fault-injecting links on a virtual tick clock. Every run with the
//! same seed and inputs produces the same event trace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod link;
pub mod model;
pub mod scenario;
pub mod world;

pub use link::{Fault, LinkFaults, SimLink};
pub use model::{LockModel, Operation, Outcome, Perturbation};
pub use world::{Event, Node, SimControl, World, WorldConfig};

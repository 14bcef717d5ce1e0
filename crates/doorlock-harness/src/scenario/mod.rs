//! Scenario testing with mandatory oracles.
//!
//! A scenario declares the EEPROM contents, the link conditions and a script
//! of key presses, tick advances and raw injections. It cannot run until an
//! oracle is attached; the oracle inspects the final [`World`] and its event
//! trace.
//!
//! ```text
//! Scenario::new(..).stored(..).keys(..).advance(..)
//!        │
//!        ▼ .oracle(..)
//! RunnableScenario ── run ──> World ── oracle ──> Ok / Err(reason)
//! ```

mod builder;
pub mod oracle;

pub use builder::{RunnableScenario, Scenario, Step};

pub use crate::world::World;

/// Verifies the final world state.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;

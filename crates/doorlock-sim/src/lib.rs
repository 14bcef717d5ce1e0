//! Desktop simulation of the two-board door lock.
//!
//! Both node state machines run unchanged on a tokio runtime. The serial link
//! is a pair of `mpsc` channels, the shared tick comes from
//! `tokio::time::interval`, and the Control board's EEPROM, motor and buzzer
//! are the `doorlock-hal` drivers over simulated peripherals.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod board;
pub mod error;
pub mod runtime;

pub use args::Args;
pub use board::{LoggedPin, SimControl, SimOutputs};
pub use error::SimError;
pub use runtime::{Report, run};

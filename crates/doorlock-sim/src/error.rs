//! Simulation errors.

use doorlock_core::StorageError;
use doorlock_hal::HalError;
use thiserror::Error;

/// Why a simulation run failed.
#[derive(Debug, Error)]
pub enum SimError {
    /// A `--stored` value that is not five decimal digits.
    #[error("invalid credential {0:?}: expected five decimal digits")]
    InvalidCredential(String),

    /// A simulated output pin failed.
    #[error(transparent)]
    Hal(#[from] HalError),

    /// The simulated EEPROM failed outside the protocol.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The other node's task ended while this one still needed it.
    #[error("link to the {0} node closed")]
    LinkClosed(&'static str),

    /// The run hit `--max-ticks` before both nodes came to rest.
    #[error("gave up after {ticks} ticks with {pending} keys unpressed")]
    TickLimit {
        /// Ticks elapsed
        ticks: u32,
        /// Keys still in the script
        pending: usize,
    },

    /// A node task panicked or was cancelled.
    #[error("node task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

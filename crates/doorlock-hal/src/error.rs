//! Peripheral faults.

use embedded_hal::digital;
use thiserror::Error;

/// Output pin failure while driving the motor or buzzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HalError {
    /// An H-bridge input could not be set.
    #[error("motor pin fault: {0:?}")]
    Motor(digital::ErrorKind),

    /// The buzzer pin could not be set.
    #[error("buzzer pin fault: {0:?}")]
    Buzzer(digital::ErrorKind),
}

impl HalError {
    pub(crate) fn motor<E: digital::Error>(err: &E) -> Self {
        Self::Motor(err.kind())
    }

    pub(crate) fn buzzer<E: digital::Error>(err: &E) -> Self {
        Self::Buzzer(err.kind())
    }
}

//! `embedded-hal` 1.0 adapters for the Control node's peripherals.
//!
//! - [`Eeprom24x`]: credential storage on a 24C04/08/16 I2C EEPROM.
//! - [`HBridge`]: door motor driven through two H-bridge inputs.
//! - [`Buzzer`]: alarm buzzer on one output pin.
//! - [`ControlOutputs`]: applies [`doorlock_core::ControlAction`]s to the
//!   motor and buzzer.
//!
//! [`I2cMemory`] simulates a 24C16 on the bus so the EEPROM driver can run
//! off-target.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actuator;
pub mod eeprom;
pub mod error;
pub mod memory;

pub use actuator::{ActiveLevel, Buzzer, ControlOutputs, HBridge};
pub use eeprom::{Eeprom24x, device_address};
pub use error::HalError;
pub use memory::I2cMemory;

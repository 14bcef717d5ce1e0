//! State machines for the two-node door-lock system.
//!
//! The HMI node owns the keypad and display; the Control node owns the
//! credential store, the door motor and the buzzer. They talk over a UART
//! using the wire format in [`doorlock_proto`].
//!
//! Both nodes are written as pure state machines. They never block, sleep or
//! perform I/O: drivers feed them received bytes, key presses and one-second
//! ticks, and execute the actions they return. Credential storage is the one
//! exception; Control calls it through the [`storage::ByteStorage`] trait,
//! which a simulator, a test, or an I2C EEPROM driver implements.
//!
//! ```text
//!            keys                 bytes                     bytes
//!   keypad ───────> ┌─────────┐ ───────> UART ───────> ┌─────────────┐ ──> motor, buzzer
//!                   │ HmiNode │                        │ ControlNode │
//!   display <────── └─────────┘ <─────── UART <─────── └─────────────┘ <─> ByteStorage
//!          screens                bytes                     bytes
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod control;
pub mod credential;
pub mod door;
pub mod error;
pub mod hmi;
pub mod keypad;
pub mod screen;
pub mod storage;
pub mod time;
pub mod verify;

pub use config::{HmiConfig, StorageConfig, TimingConfig};
pub use control::{ControlAction, ControlNode, ControlState};
pub use credential::{CredentialStore, NoDelay};
pub use door::Direction;
pub use error::{ControlError, HmiError};
pub use hmi::{HmiAction, HmiNode, HmiState};
pub use keypad::Key;
pub use screen::Screen;
pub use storage::{ByteStorage, MemoryStorage, StorageError};
pub use time::{Tick, TickCounter, Window};

/// The two password-gated user flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    /// `+` from the menu: verify, then capture a new password
    ChangePassword,
    /// `-` from the menu: verify, then run a door cycle
    Door,
}

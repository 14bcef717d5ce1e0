//! Node configuration.
//!
//! Defaults reproduce the deployed firmware: 10 s door windows, a 60 s alarm,
//! a 10 ms EEPROM settle time and a 300 ms keypad debounce.

use std::time::Duration;

/// Timing windows and protocol timeouts, in ticks (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// How long the actuator drives the door open
    pub door_open_window: u32,
    /// How long the actuator drives the door closed
    pub door_close_window: u32,
    /// How long the lockout alarm lasts
    pub alarm_window: u32,
    /// How long a sender waits for the peer's reply before falling back
    pub reply_timeout: u32,
    /// Longest gap allowed between bytes of one password message
    pub byte_timeout: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            door_open_window: 10,
            door_close_window: 10,
            alarm_window: 60,
            reply_timeout: 3,
            byte_timeout: 2,
        }
    }
}

/// Where and how the credential is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageConfig {
    /// Address of the first credential digit; the rest follow sequentially
    pub base_address: u16,
    /// Pause after every storage transaction (EEPROM write cycle)
    pub settle_delay_ms: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { base_address: 0x0311, settle_delay_ms: 10 }
    }
}

/// HMI presentation timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HmiConfig {
    /// Pause after every captured key press
    pub debounce: Duration,
    /// How long a short notice ("Correct Pass") stays on screen
    pub notice_hold: Duration,
    /// How long an important notice ("Password Saved!") stays on screen
    pub result_hold: Duration,
}

impl Default for HmiConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            notice_hold: Duration::from_millis(500),
            result_hold: Duration::from_millis(1000),
        }
    }
}

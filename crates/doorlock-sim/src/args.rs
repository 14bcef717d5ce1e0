//! Command-line arguments.

use clap::Parser;
use doorlock_core::TimingConfig;
use doorlock_proto::Credential;

use crate::error::SimError;

/// Run the door-lock HMI and Control nodes against each other.
#[derive(Debug, Clone, Parser)]
#[command(name = "doorlock-sim", version)]
pub struct Args {
    /// Keys to press in order: digits, `+` (change password), `-` (open
    /// door). Spaces are ignored.
    #[arg(long, default_value = "")]
    pub keys: String,

    /// Boot with this credential already in the EEPROM
    #[arg(long, value_parser = parse_credential, conflicts_with = "fresh")]
    pub stored: Option<Credential>,

    /// Boot with an erased EEPROM (the default). Wins over `stored` when
    /// both are set programmatically.
    #[arg(long)]
    pub fresh: bool,

    /// Ticks the motor drives the door each way
    #[arg(long, default_value_t = 10)]
    pub door_window: u32,

    /// Ticks the lockout alarm sounds
    #[arg(long, default_value_t = 60)]
    pub alarm_window: u32,

    /// Ticks a node waits for its peer before falling back
    #[arg(long, default_value_t = 3)]
    pub reply_timeout: u32,

    /// Wall-clock length of one tick, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,

    /// Delay between scripted key presses, in milliseconds
    #[arg(long, default_value_t = 250)]
    pub key_ms: u64,

    /// Stop after this many ticks even if the nodes are still busy
    #[arg(long, default_value_t = 600)]
    pub max_ticks: u32,
}

impl Args {
    /// Credential to pre-program into the EEPROM before boot.
    pub fn boot_credential(&self) -> Option<Credential> {
        if self.fresh { None } else { self.stored }
    }

    /// Node timing built from the window arguments.
    pub fn timing(&self) -> TimingConfig {
        TimingConfig {
            door_open_window: self.door_window,
            door_close_window: self.door_window,
            alarm_window: self.alarm_window,
            reply_timeout: self.reply_timeout,
            ..TimingConfig::default()
        }
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            keys: String::new(),
            stored: None,
            fresh: false,
            door_window: 10,
            alarm_window: 60,
            reply_timeout: 3,
            tick_ms: 1000,
            key_ms: 250,
            max_ticks: 600,
        }
    }
}

fn parse_credential(value: &str) -> Result<Credential, SimError> {
    let digits: Option<Vec<u8>> = value.chars().map(|c| c.to_digit(10).map(|d| d as u8)).collect();
    digits
        .as_deref()
        .and_then(Credential::from_slice)
        .ok_or_else(|| SimError::InvalidCredential(value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_windows_and_credential() {
        let args = Args::try_parse_from([
            "doorlock-sim",
            "--stored",
            "12345",
            "--door-window",
            "4",
            "--keys",
            "- 12345",
        ])
        .unwrap();

        assert_eq!(args.stored, Some(Credential::new([1, 2, 3, 4, 5])));
        assert_eq!(args.timing().door_open_window, 4);
        assert_eq!(args.timing().door_close_window, 4);
        assert_eq!(args.timing().byte_timeout, TimingConfig::default().byte_timeout);
        assert_eq!(args.keys, "- 12345");
    }

    #[test]
    fn rejects_malformed_credentials() {
        for bad in ["1234", "123456", "12a45", ""] {
            assert!(parse_credential(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn fresh_erases_the_eeprom() {
        let args = Args::try_parse_from(["doorlock-sim", "--fresh"]).unwrap();
        assert_eq!(args.boot_credential(), None);

        let args =
            Args { fresh: true, stored: Some(Credential::new([1, 2, 3, 4, 5])), ..Args::default() };
        assert_eq!(args.boot_credential(), None);

        let args = Args { stored: Some(Credential::new([1, 2, 3, 4, 5])), ..Args::default() };
        assert_eq!(args.boot_credential(), Some(Credential::new([1, 2, 3, 4, 5])));
    }

    #[test]
    fn fresh_conflicts_with_stored() {
        let result = Args::try_parse_from(["doorlock-sim", "--fresh", "--stored", "12345"]);
        assert!(result.is_err());
    }

    #[test]
    fn defaults_match_firmware_timing() {
        let args = Args::try_parse_from(["doorlock-sim"]).unwrap();
        assert_eq!(args.timing(), TimingConfig::default());
        assert_eq!(args.stored, None);
    }
}

//! The Control board's peripherals, simulated.

use std::convert::Infallible;

use doorlock_core::{ControlNode, CredentialStore, NoDelay, StorageConfig, TimingConfig};
use doorlock_hal::{Buzzer, ControlOutputs, Eeprom24x, HBridge, I2cMemory};
use doorlock_proto::Credential;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::error::SimError;

/// Control node on a simulated 24C16.
pub type SimControl = ControlNode<Eeprom24x<I2cMemory>, NoDelay>;

/// Motor and buzzer on logged pins.
pub type SimOutputs = ControlOutputs<LoggedPin, LoggedPin, LoggedPin>;

/// Output pin that logs every level change.
#[derive(Debug)]
pub struct LoggedPin {
    name: &'static str,
    high: bool,
}

impl LoggedPin {
    /// A low pin.
    pub fn new(name: &'static str) -> Self {
        Self { name, high: false }
    }

    /// Current level.
    pub fn is_high(&self) -> bool {
        self.high
    }

    fn drive(&mut self, high: bool) {
        if self.high != high {
            tracing::trace!(pin = self.name, high, "pin");
        }
        self.high = high;
    }
}

impl ErrorType for LoggedPin {
    type Error = Infallible;
}

impl OutputPin for LoggedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

/// Build the Control node and its outputs. With `stored` the EEPROM starts
/// provisioned, otherwise erased.
pub fn control_board(
    stored: Option<Credential>,
    timing: TimingConfig,
) -> Result<(SimControl, SimOutputs), SimError> {
    let config = StorageConfig::default();
    let memory = match stored {
        Some(credential) => I2cMemory::with_contents(config.base_address, credential.digits()),
        None => I2cMemory::new(),
    };
    let store = CredentialStore::new(Eeprom24x::new(memory), NoDelay, config);

    let motor = HBridge::new(LoggedPin::new("motor.in1"), LoggedPin::new("motor.in2"))?;
    let buzzer = Buzzer::active_high(LoggedPin::new("buzzer"))?;

    Ok((ControlNode::new(store, timing), ControlOutputs::new(motor, buzzer)))
}

#[cfg(test)]
mod tests {
    use doorlock_core::{ControlAction, Direction};

    use super::*;

    #[test]
    fn outputs_follow_actions() {
        let (_, mut outputs) = control_board(None, TimingConfig::default()).unwrap();

        outputs.apply(&ControlAction::Actuate(Direction::Open)).unwrap();
        outputs.apply(&ControlAction::Buzzer(true)).unwrap();
        assert_eq!(outputs.motor.direction(), Direction::Open);
        assert!(outputs.buzzer.is_on());

        outputs.apply(&ControlAction::Actuate(Direction::Stop)).unwrap();
        assert_eq!(outputs.motor.direction(), Direction::Stop);
    }

    #[test]
    fn stored_credential_lands_in_eeprom() {
        let (mut control, _) =
            control_board(Some(Credential::new([4, 4, 2, 0, 1])), TimingConfig::default()).unwrap();
        let stored = control.store_mut().read_credential().unwrap();
        assert_eq!(stored, Credential::new([4, 4, 2, 0, 1]));
        assert_eq!(control.store_mut().is_empty(), Ok(false));
    }
}

//! Door motor and buzzer outputs.

use doorlock_core::{ControlAction, Direction};
use embedded_hal::digital::OutputPin;

use crate::error::HalError;

/// Whether an output is driven active-high or active-low on the board wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveLevel {
    /// Logic high turns the output on
    High,
    /// Logic low turns the output on
    Low,
}

/// DC motor behind an H-bridge with two direction inputs.
///
/// | Direction | IN1 | IN2 |
/// |-----------|-----|-----|
/// | Stop      | low | low |
/// | Open      | high| low |
/// | Close     | low | high|
pub struct HBridge<A, B> {
    in1: A,
    in2: B,
    direction: Direction,
}

impl<A: OutputPin, B: OutputPin> HBridge<A, B> {
    /// Take both inputs and stop the motor.
    pub fn new(in1: A, in2: B) -> Result<Self, HalError> {
        let mut bridge = Self { in1, in2, direction: Direction::Stop };
        bridge.drive(Direction::Stop)?;
        Ok(bridge)
    }

    /// Apply a drive.
    pub fn drive(&mut self, direction: Direction) -> Result<(), HalError> {
        let (in1, in2) = match direction {
            Direction::Stop => (false, false),
            Direction::Open => (true, false),
            Direction::Close => (false, true),
        };
        // Release before engaging so both inputs are never high together
        if in1 {
            set(&mut self.in2, in2).map_err(|e| HalError::motor(&e))?;
            set(&mut self.in1, in1).map_err(|e| HalError::motor(&e))?;
        } else {
            set(&mut self.in1, in1).map_err(|e| HalError::motor(&e))?;
            set(&mut self.in2, in2).map_err(|e| HalError::motor(&e))?;
        }
        self.direction = direction;
        Ok(())
    }

    /// Last applied drive.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Release the pins.
    pub fn free(self) -> (A, B) {
        (self.in1, self.in2)
    }
}

/// Alarm buzzer on one output pin.
pub struct Buzzer<P> {
    pin: P,
    active: ActiveLevel,
    on: bool,
}

impl<P: OutputPin> Buzzer<P> {
    /// Take the pin and silence the buzzer.
    pub fn new(pin: P, active: ActiveLevel) -> Result<Self, HalError> {
        let mut buzzer = Self { pin, active, on: true };
        buzzer.set(false)?;
        Ok(buzzer)
    }

    /// Buzzer wired active-high.
    pub fn active_high(pin: P) -> Result<Self, HalError> {
        Self::new(pin, ActiveLevel::High)
    }

    /// Switch the buzzer on or off.
    pub fn set(&mut self, on: bool) -> Result<(), HalError> {
        let level = match self.active {
            ActiveLevel::High => on,
            ActiveLevel::Low => !on,
        };
        set(&mut self.pin, level).map_err(|e| HalError::buzzer(&e))?;
        self.on = on;
        Ok(())
    }

    /// Whether the buzzer is sounding.
    #[inline]
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Release the pin.
    pub fn free(self) -> P {
        self.pin
    }
}

/// The Control node's physical outputs.
pub struct ControlOutputs<A, B, P> {
    /// Door motor
    pub motor: HBridge<A, B>,
    /// Alarm buzzer
    pub buzzer: Buzzer<P>,
}

impl<A: OutputPin, B: OutputPin, P: OutputPin> ControlOutputs<A, B, P> {
    /// Bundle the outputs.
    pub fn new(motor: HBridge<A, B>, buzzer: Buzzer<P>) -> Self {
        Self { motor, buzzer }
    }

    /// Apply an output action. `Send` actions are not outputs and return
    /// `Ok(false)`.
    pub fn apply(&mut self, action: &ControlAction) -> Result<bool, HalError> {
        match action {
            ControlAction::Actuate(direction) => {
                tracing::debug!(?direction, "motor");
                self.motor.drive(*direction)?;
            },
            ControlAction::Buzzer(on) => {
                tracing::debug!(on, "buzzer");
                self.buzzer.set(*on)?;
            },
            ControlAction::Send(_) => return Ok(false),
        }
        Ok(true)
    }
}

fn set<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), P::Error> {
    if high { pin.set_high() } else { pin.set_low() }
}

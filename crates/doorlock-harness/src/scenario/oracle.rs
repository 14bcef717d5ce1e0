//! Reusable oracle checks.

use doorlock_core::{ControlState, Direction, HmiState};
use doorlock_proto::{Credential, Opcode};

use crate::{
    scenario::OracleFn,
    world::{Event, Node, World},
};

/// Every oracle must pass; the first failure is reported.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world| oracles.iter().try_for_each(|oracle| oracle(world)))
}

/// Ad-hoc check written inline by a test.
pub fn check<F>(f: F) -> OracleFn
where
    F: Fn(&World) -> Result<(), String> + 'static,
{
    Box::new(f)
}

/// The EEPROM holds exactly `digits`.
pub fn stored_credential(digits: [u8; 5]) -> OracleFn {
    Box::new(move |world| {
        let expected = Credential::new(digits);
        match world.stored_credential() {
            Some(stored) if stored == expected => Ok(()),
            other => Err(format!(
                "expected stored {:?}, found {:?}",
                expected.digits(),
                other.map(|c| *c.digits())
            )),
        }
    })
}

/// The HMI ended in `state`.
pub fn hmi_state(state: HmiState) -> OracleFn {
    Box::new(move |world| {
        if world.hmi().state() == state {
            Ok(())
        } else {
            Err(format!("HMI should be {state:?}, got {:?}", world.hmi().state()))
        }
    })
}

/// The Control node ended in `state`.
pub fn control_state(state: ControlState) -> OracleFn {
    Box::new(move |world| {
        if world.control().state() == state {
            Ok(())
        } else {
            Err(format!("Control should be {state:?}, got {:?}", world.control().state()))
        }
    })
}

/// Control sent `opcode` at least once.
pub fn control_sent(opcode: Opcode) -> OracleFn {
    Box::new(move |world| {
        if world.sent(Node::Control).contains(&opcode) {
            Ok(())
        } else {
            Err(format!("Control never sent {opcode:?}; sent {:?}", world.sent(Node::Control)))
        }
    })
}

/// `node` never sent `opcode`.
pub fn never_sent(node: Node, opcode: Opcode) -> OracleFn {
    Box::new(move |world| {
        if world.sent(node).contains(&opcode) {
            Err(format!("{node:?} sent {opcode:?}"))
        } else {
            Ok(())
        }
    })
}

/// Exactly `n` door openings happened.
pub fn door_cycles(n: usize) -> OracleFn {
    Box::new(move |world| {
        let cycles = world.door_cycles();
        if cycles == n { Ok(()) } else { Err(format!("expected {n} door cycles, got {cycles}")) }
    })
}

/// Exactly `n` lockout alarms were raised.
pub fn alarms(n: usize) -> OracleFn {
    Box::new(move |world| {
        let alarms = world.alarms();
        if alarms == n { Ok(()) } else { Err(format!("expected {n} alarms, got {alarms}")) }
    })
}

/// Nothing is in progress: motor stopped, buzzer off, no pending replies.
pub fn quiescent() -> OracleFn {
    Box::new(|world| {
        if world.is_quiescent() {
            Ok(())
        } else {
            Err(format!(
                "not quiescent: hmi {:?}, control {:?}, motor {:?}, buzzer {}",
                world.hmi().state(),
                world.control().state(),
                world.control().actuator(),
                world.control().buzzer()
            ))
        }
    })
}

/// Neither node recorded a fault.
pub fn no_faults() -> OracleFn {
    Box::new(|world| {
        let control = world.control().fault_count();
        let hmi = world.hmi().fault_count();
        if control == 0 && hmi == 0 {
            Ok(())
        } else {
            Err(format!(
                "faults recorded: control {control} ({:?}), hmi {hmi} ({:?})",
                world.control().last_fault(),
                world.hmi().last_fault()
            ))
        }
    })
}

/// The door never opened without a CORRECT_PASSWORD from Control since the
/// previous opening.
pub fn door_opens_only_after_correct() -> OracleFn {
    Box::new(|world| {
        let mut authorized = 0usize;
        for event in world.events() {
            match event {
                Event::Sent { node: Node::Control, message, .. }
                    if message.opcode() == Opcode::CorrectPassword =>
                {
                    authorized += 1;
                },
                Event::Actuate { at, direction: Direction::Open } => {
                    if authorized == 0 {
                        return Err(format!("door opened at {at:?} without authorization"));
                    }
                    authorized -= 1;
                },
                _ => {},
            }
        }
        Ok(())
    })
}

/// Every buzzer activation lasted exactly `ticks`.
pub fn alarm_duration(ticks: u32) -> OracleFn {
    Box::new(move |world| {
        let log = world.buzzer_log();
        for pair in log.chunks(2) {
            match pair {
                [(on_at, true), (off_at, false)] if off_at.since(*on_at) == ticks => {},
                [(_, true)] => return Err("alarm still sounding".into()),
                other => return Err(format!("unexpected buzzer sequence {other:?}")),
            }
        }
        Ok(())
    })
}

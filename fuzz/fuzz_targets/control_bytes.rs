//! Drive a provisioned Control node with arbitrary bytes and ticks.
//!
//! Whatever arrives, the node must never open the door without first
//! replying CORRECT_PASSWORD, and the buzzer must only sound in `Alarm`.

#![no_main]

use arbitrary::Arbitrary;
use doorlock_core::{
    ControlAction, ControlNode, ControlState, CredentialStore, Direction, MemoryStorage, NoDelay,
    StorageConfig, Tick, TimingConfig,
};
use doorlock_proto::{Message, Opcode};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input {
    Byte(u8),
    Advance(u8),
}

fuzz_target!(|inputs: Vec<Input>| {
    let config = StorageConfig::default();
    let storage = MemoryStorage::with_contents(config.base_address, &[1, 2, 3, 4, 5]);
    let mut node = ControlNode::new(CredentialStore::new(storage, NoDelay, config), TimingConfig::default());

    let mut now = Tick::default();
    let mut authorized = 0usize;
    for input in inputs {
        let actions = match input {
            Input::Byte(byte) => node.handle_byte(byte, now),
            Input::Advance(ticks) => {
                let mut actions = Vec::new();
                for _ in 0..ticks {
                    now = now.offset(1);
                    actions.extend(node.tick(now));
                }
                actions
            },
        };

        for action in actions {
            match action {
                ControlAction::Send(Message::Signal(Opcode::CorrectPassword)) => authorized += 1,
                ControlAction::Actuate(Direction::Open) => {
                    assert!(authorized > 0, "door opened without authorization");
                    authorized -= 1;
                },
                _ => {},
            }
        }
        assert_eq!(node.buzzer(), matches!(node.state(), ControlState::Alarm(_)));
    }
});

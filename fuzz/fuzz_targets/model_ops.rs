//! Replay arbitrary user sessions against the reference model.
//!
//! The model must never leave a non-digit credential behind and must raise
//! exactly one alarm per session with three wrong entries.

#![no_main]

use doorlock_harness::{LockModel, Operation};
use doorlock_proto::Credential;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: ([u8; 5], Vec<Operation>)| {
    let (initial, ops) = input;
    let mut model = LockModel::new(Credential::new(initial.map(|d| d % 10)));

    for op in &ops {
        let alarms = model.alarms();
        model.apply(op);
        let locked = op.normalized().wrong().len() == 3;
        assert_eq!(model.alarms(), alarms + usize::from(locked));
        assert!(model.stored().digits().iter().all(|d| *d < 10));
    }
});

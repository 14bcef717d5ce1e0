//! Model-based property tests.
//!
//! These tests generate random user sessions and verify that the two
//! simulated nodes behave identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!       LockModel      RealWorld       Compare
//!      (reference)   (both nodes)      Results
//! ```

use doorlock_core::{HmiState, MemoryStorage, TimingConfig, verify::Verdict};
use doorlock_harness::{LockModel, Operation, Perturbation, World, WorldConfig};
use doorlock_proto::Credential;
use proptest::prelude::*;

/// Real system wrapper that mirrors LockModel's interface.
struct RealWorld {
    world: World,
    timing: TimingConfig,
}

impl RealWorld {
    fn new(stored: Credential) -> Self {
        let config = WorldConfig::default();
        let storage = MemoryStorage::with_contents(config.storage.base_address, stored.digits());
        let mut world = World::new(storage, config);
        world.boot();
        Self { world, timing: config.timing }
    }

    /// Play one session as a user who knows `stored`.
    fn apply(&mut self, op: &Operation, stored: &Credential) {
        let op = op.normalized();
        self.world.type_keys(match op {
            Operation::OpenDoor { .. } => "-",
            Operation::ChangePassword { .. } => "+",
        });

        for wrong in op.wrong() {
            self.type_credential(&wrong.apply(stored));
        }
        if self.world.hmi().is_locked() {
            self.world.advance(self.timing.alarm_window);
        }
        self.type_credential(stored);

        match op {
            Operation::OpenDoor { .. } => {
                let cycle = self.timing.door_open_window + self.timing.door_close_window;
                self.world.advance(cycle + 5);
            },
            Operation::ChangePassword { new, .. } => {
                let new = Credential::new(new);
                self.type_credential(&new);
                self.type_credential(&new);
            },
        }
    }

    fn type_credential(&mut self, credential: &Credential) {
        let keys: String =
            credential.digits().iter().map(|d| char::from(b'0' + d)).collect();
        self.world.type_keys(&keys);
    }
}

fn perturbation_strategy() -> impl Strategy<Value = Perturbation> {
    (any::<u8>(), any::<u8>()).prop_map(|(position, delta)| Perturbation { position, delta })
}

fn credential_strategy() -> impl Strategy<Value = [u8; 5]> {
    prop::array::uniform5(0..10u8)
}

fn wrong_strategy() -> impl Strategy<Value = Vec<Perturbation>> {
    prop::collection::vec(perturbation_strategy(), 0..5)
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => wrong_strategy().prop_map(|wrong| Operation::OpenDoor { wrong }),
        2 => (wrong_strategy(), credential_strategy())
            .prop_map(|(wrong, new)| Operation::ChangePassword { wrong, new }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Verify that the stored credential, door cycles and alarms match
    /// between model and real implementation after every session.
    #[test]
    fn prop_model_matches_real(
        initial in credential_strategy(),
        ops in prop::collection::vec(operation_strategy(), 0..8)
    ) {
        let initial = Credential::new(initial);
        let mut model = LockModel::new(initial);
        let mut real = RealWorld::new(initial);

        for (i, op) in ops.iter().enumerate() {
            let stored = model.stored();
            real.apply(op, &stored);
            model.apply(op);

            prop_assert_eq!(
                real.world.stored_credential(),
                Some(model.stored()),
                "credential diverged at op {}: {:?}", i, op
            );
            prop_assert_eq!(real.world.door_cycles(), model.door_cycles(), "op {}: {:?}", i, op);
            prop_assert_eq!(real.world.alarms(), model.alarms(), "op {}: {:?}", i, op);
            prop_assert_eq!(real.world.hmi().state(), HmiState::Menu, "op {}: {:?}", i, op);
            prop_assert!(real.world.is_quiescent(), "op {}: {:?}", i, op);
            prop_assert!(!real.world.control().is_locked(), "op {}: {:?}", i, op);
        }

        prop_assert_eq!(real.world.control().fault_count(), 0);
        prop_assert_eq!(real.world.hmi().fault_count(), 0);
    }

    /// Lockout happens exactly when three wrong entries precede the correct one.
    #[test]
    fn prop_lockout_iff_three_wrong(
        initial in credential_strategy(),
        op in operation_strategy()
    ) {
        let mut model = LockModel::new(Credential::new(initial));
        let outcome = model.apply(&op);
        let wrong = op.normalized().wrong().len();

        if wrong == 3 {
            prop_assert_eq!(outcome.verdict, Verdict::LockedOut);
            prop_assert_eq!(outcome.attempts, 3);
            prop_assert_eq!(model.alarms(), 1);
        } else {
            prop_assert_eq!(outcome.verdict, Verdict::Matched);
            prop_assert_eq!(usize::from(outcome.attempts), wrong + 1);
            prop_assert_eq!(model.alarms(), 0);
        }
    }

    /// Model invariants hold for any session sequence.
    #[test]
    fn prop_model_invariants(
        initial in credential_strategy(),
        ops in prop::collection::vec(operation_strategy(), 0..50)
    ) {
        let mut model = LockModel::new(Credential::new(initial));
        for op in &ops {
            model.apply(op);
        }

        let doors = ops.iter().filter(|op| matches!(op, Operation::OpenDoor { .. })).count();
        prop_assert_eq!(model.door_cycles(), doors);
        prop_assert_eq!(model.saves(), ops.len() - doors);
        prop_assert!(model.alarms() <= ops.len());
        prop_assert!(model.stored().digits().iter().all(|d| *d < 10));
    }
}

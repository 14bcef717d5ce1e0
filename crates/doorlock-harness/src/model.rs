//! Reference model of the lock's user-visible behavior.
//!
//! The model ignores the wire entirely. It knows the stored credential and
//! applies the verification rule directly, so the simulated nodes can be
//! checked against it operation by operation.

use std::iter;

use arbitrary::Arbitrary;
use doorlock_core::verify::{MAX_ATTEMPTS, Verdict, verify_attempts};
use doorlock_proto::{CREDENTIAL_LEN, Credential};

/// A wrong password derived from the stored one by changing one digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct Perturbation {
    /// Digit to change (taken modulo 5)
    pub position: u8,
    /// Amount to add to it (mapped into 1..=9)
    pub delta: u8,
}

impl Perturbation {
    /// A credential that differs from `stored` in exactly one position.
    /// `stored` must hold decimal digits.
    pub fn apply(&self, stored: &Credential) -> Credential {
        let mut digits = *stored.digits();
        let slot = usize::from(self.position) % CREDENTIAL_LEN;
        let delta = self.delta % 9 + 1;
        digits[slot] = (digits[slot] % 10 + delta) % 10;
        Credential::new(digits)
    }
}

/// A user session from the main menu.
///
/// The user types the `wrong` passwords in order, then the correct one. At
/// most [`MAX_ATTEMPTS`] wrong entries are used: the third triggers the
/// lockout, after which the correct password is the recovery check.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// `-`: verify, then run a door cycle
    OpenDoor {
        /// Wrong entries before the correct one
        wrong: Vec<Perturbation>,
    },
    /// `+`: verify, then set `new` (typed twice)
    ChangePassword {
        /// Wrong entries before the correct one
        wrong: Vec<Perturbation>,
        /// Replacement password (digits taken modulo 10)
        new: [u8; CREDENTIAL_LEN],
    },
}

impl Operation {
    /// Clamp to the range the lock can act on.
    pub fn normalized(&self) -> Self {
        match self {
            Self::OpenDoor { wrong } => Self::OpenDoor { wrong: clamp(wrong) },
            Self::ChangePassword { wrong, new } => {
                Self::ChangePassword { wrong: clamp(wrong), new: new.map(|d| d % 10) }
            },
        }
    }

    /// Wrong entries.
    pub fn wrong(&self) -> &[Perturbation] {
        match self {
            Self::OpenDoor { wrong } | Self::ChangePassword { wrong, .. } => wrong,
        }
    }
}

fn clamp(wrong: &[Perturbation]) -> Vec<Perturbation> {
    wrong.iter().take(usize::from(MAX_ATTEMPTS)).copied().collect()
}

/// What the model predicts for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Verdict of the last verification before the flow proceeded
    pub verdict: Verdict,
    /// Password entries consumed by that verification
    pub attempts: u8,
}

/// The reference model.
#[derive(Debug, Clone)]
pub struct LockModel {
    stored: Credential,
    door_cycles: usize,
    alarms: usize,
    saves: usize,
}

impl LockModel {
    /// Model with `stored` already provisioned.
    pub fn new(stored: Credential) -> Self {
        Self { stored, door_cycles: 0, alarms: 0, saves: 0 }
    }

    /// Stored credential.
    pub fn stored(&self) -> Credential {
        self.stored
    }

    /// Door cycles run.
    pub fn door_cycles(&self) -> usize {
        self.door_cycles
    }

    /// Lockouts raised.
    pub fn alarms(&self) -> usize {
        self.alarms
    }

    /// Passwords changed.
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Apply one session.
    pub fn apply(&mut self, operation: &Operation) -> Outcome {
        let operation = operation.normalized();
        let candidates: Vec<Credential> = operation
            .wrong()
            .iter()
            .map(|p| p.apply(&self.stored))
            .chain(iter::once(self.stored))
            .collect();

        let (verdict, attempts) =
            verify_attempts(&self.stored, candidates).unwrap_or((Verdict::Matched, 0));
        if verdict == Verdict::LockedOut {
            // the correct entry that follows is the recovery check
            self.alarms += 1;
        }

        match operation {
            Operation::OpenDoor { .. } => self.door_cycles += 1,
            Operation::ChangePassword { new, .. } => {
                self.stored = Credential::new(new);
                self.saves += 1;
            },
        }

        Outcome { verdict, attempts }
    }
}

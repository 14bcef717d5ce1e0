//! Password verification and three-strike lockout.
//!
//! Both nodes run the same bookkeeping: Control as the authoritative check
//! against storage, HMI to drive its local retry prompt. Neither transmits its
//! counter; they agree because each sees the same sequence of results.

use doorlock_proto::{CREDENTIAL_LEN, Credential};

/// Consecutive mismatches that trigger a lockout.
pub const MAX_ATTEMPTS: u8 = 3;

/// Outcome of one verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// All digits agree.
    Matched,
    /// Mismatch; `remaining` further attempts before lockout.
    RetryAllowed {
        /// Attempts left (1 or 2)
        remaining: u8,
    },
    /// Third consecutive mismatch.
    LockedOut,
}

/// Counts consecutive failed comparisons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptCounter {
    failures: u8,
}

impl AttemptCounter {
    /// Counter at zero.
    pub const fn new() -> Self {
        Self { failures: 0 }
    }

    /// Consecutive failures so far.
    pub fn failures(&self) -> u8 {
        self.failures
    }

    /// A successful comparison resets the count.
    pub fn record_match(&mut self) {
        self.failures = 0;
    }

    /// Count a mismatch. The third one resets the counter and reports
    /// [`Verdict::LockedOut`].
    pub fn record_mismatch(&mut self) -> Verdict {
        self.failures += 1;
        if self.failures >= MAX_ATTEMPTS {
            self.failures = 0;
            Verdict::LockedOut
        } else {
            Verdict::RetryAllowed { remaining: MAX_ATTEMPTS - self.failures }
        }
    }

    /// Classify a position match count. Anything short of all five digits is
    /// a full mismatch.
    pub fn record(&mut self, match_count: u8) -> Verdict {
        if match_count as usize == CREDENTIAL_LEN {
            self.record_match();
            Verdict::Matched
        } else {
            self.record_mismatch()
        }
    }
}

/// Attempt counter plus the lockout flag it raises.
///
/// The flag stays raised after the alarm window; it is cleared by the next
/// successful check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockoutGuard {
    attempts: AttemptCounter,
    locked: bool,
}

impl LockoutGuard {
    /// Unlocked guard with no failures.
    pub const fn new() -> Self {
        Self { attempts: AttemptCounter::new(), locked: false }
    }

    /// Whether a lockout has happened and not yet been cleared.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Consecutive failures so far.
    pub fn failures(&self) -> u8 {
        self.attempts.failures()
    }

    /// Evaluate one comparison result, updating counter and flag.
    pub fn evaluate(&mut self, match_count: u8) -> Verdict {
        let verdict = self.attempts.record(match_count);
        match verdict {
            Verdict::Matched => self.locked = false,
            Verdict::LockedOut => self.locked = true,
            Verdict::RetryAllowed { .. } => {},
        }
        verdict
    }

    /// Adopt a lockout reported by the authoritative peer.
    pub fn force_lockout(&mut self) {
        self.attempts = AttemptCounter::new();
        self.locked = true;
    }

    /// Forget failures without touching the flag (flow aborted).
    pub fn reset_attempts(&mut self) {
        self.attempts = AttemptCounter::new();
    }
}

/// Run up to [`MAX_ATTEMPTS`] comparisons of `candidates` against `stored`.
///
/// Stops at the first match or at lockout and reports how many candidates
/// were consumed. If the candidates run out first the last verdict is
/// returned (`RetryAllowed`), or `None` when there were none at all.
pub fn verify_attempts<I>(stored: &Credential, candidates: I) -> Option<(Verdict, u8)>
where
    I: IntoIterator<Item = Credential>,
{
    let mut counter = AttemptCounter::new();
    let mut last = None;
    for (used, candidate) in (1..=MAX_ATTEMPTS).zip(candidates) {
        let verdict = counter.record(stored.match_count(&candidate));
        last = Some((verdict, used));
        if !matches!(verdict, Verdict::RetryAllowed { .. }) {
            break;
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn lockout_on_third_mismatch_only() {
        let mut counter = AttemptCounter::new();
        assert_eq!(counter.record(4), Verdict::RetryAllowed { remaining: 2 });
        assert_eq!(counter.record(0), Verdict::RetryAllowed { remaining: 1 });
        assert_eq!(counter.record(3), Verdict::LockedOut);
        assert_eq!(counter.failures(), 0);
    }

    #[test]
    fn match_resets_counter() {
        let mut counter = AttemptCounter::new();
        counter.record(1);
        counter.record(2);
        assert_eq!(counter.record(5), Verdict::Matched);
        assert_eq!(counter.failures(), 0);
        assert_eq!(counter.record(0), Verdict::RetryAllowed { remaining: 2 });
    }

    #[test]
    fn guard_flag_follows_verdicts() {
        let mut guard = LockoutGuard::new();
        for _ in 0..2 {
            guard.evaluate(0);
            assert!(!guard.is_locked());
        }
        assert_eq!(guard.evaluate(0), Verdict::LockedOut);
        assert!(guard.is_locked());

        // still locked after further failures
        guard.evaluate(0);
        assert!(guard.is_locked());

        assert_eq!(guard.evaluate(5), Verdict::Matched);
        assert!(!guard.is_locked());
    }

    #[test]
    fn bounded_attempts_stop_at_lockout() {
        let stored = Credential::new([9, 9, 9, 9, 9]);
        let wrong = std::iter::repeat(Credential::new([1, 1, 1, 1, 1]));
        assert_eq!(verify_attempts(&stored, wrong), Some((Verdict::LockedOut, 3)));
    }

    #[test]
    fn bounded_attempts_stop_at_match() {
        let stored = Credential::new([9, 9, 9, 9, 9]);
        let candidates = [Credential::new([9, 9, 9, 9, 1]), stored, Credential::new([0; 5])];
        assert_eq!(verify_attempts(&stored, candidates), Some((Verdict::Matched, 2)));
        assert_eq!(verify_attempts(&stored, []), None);
    }

    proptest! {
        #[test]
        fn lockout_exactly_on_third_consecutive_mismatch(results in prop::collection::vec(any::<bool>(), 0..40)) {
            let mut counter = AttemptCounter::new();
            let mut streak = 0u8;
            for matched in results {
                let verdict = counter.record(if matched { 5 } else { 2 });
                if matched {
                    streak = 0;
                    prop_assert_eq!(verdict, Verdict::Matched);
                } else {
                    streak += 1;
                    if streak == 3 {
                        streak = 0;
                        prop_assert_eq!(verdict, Verdict::LockedOut);
                    } else {
                        prop_assert_eq!(verdict, Verdict::RetryAllowed { remaining: 3 - streak });
                    }
                }
            }
        }
    }
}

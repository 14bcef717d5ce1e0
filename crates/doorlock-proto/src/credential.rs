//! The five-digit access code.

use std::fmt;

/// Number of digits in a credential. Fixed; never sent on the wire.
pub const CREDENTIAL_LEN: usize = 5;

/// Value of every slot of an erased EEPROM.
pub const UNSET_SLOT: u8 = 0xFF;

/// An ordered sequence of exactly [`CREDENTIAL_LEN`] digit bytes.
///
/// Digits are raw keypad values (0..=9 in practice) but storage and the wire
/// treat them as opaque bytes, so any `u8` is accepted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Credential([u8; CREDENTIAL_LEN]);

impl Credential {
    /// The credential read back from never-written storage.
    pub const UNSET: Self = Self([UNSET_SLOT; CREDENTIAL_LEN]);

    /// Wrap five digit bytes.
    pub const fn new(digits: [u8; CREDENTIAL_LEN]) -> Self {
        Self(digits)
    }

    /// Build from a slice, returning `None` unless it has exactly five bytes.
    pub fn from_slice(digits: &[u8]) -> Option<Self> {
        <[u8; CREDENTIAL_LEN]>::try_from(digits).ok().map(Self)
    }

    /// The digits in transmission order.
    pub const fn digits(&self) -> &[u8; CREDENTIAL_LEN] {
        &self.0
    }

    /// Whether every slot holds the erased sentinel.
    pub fn is_unset(&self) -> bool {
        self.0.iter().all(|&d| d == UNSET_SLOT)
    }

    /// Number of positions at which `self` and `other` hold the same digit.
    ///
    /// Only a count of [`CREDENTIAL_LEN`] is a match; every other value is a
    /// mismatch and is returned purely for diagnostics.
    pub fn match_count(&self, other: &Self) -> u8 {
        self.0.iter().zip(other.0.iter()).filter(|(a, b)| a == b).count() as u8
    }

    /// Whether all five positions agree.
    pub fn matches(&self, other: &Self) -> bool {
        self.match_count(other) as usize == CREDENTIAL_LEN
    }
}

impl From<[u8; CREDENTIAL_LEN]> for Credential {
    fn from(digits: [u8; CREDENTIAL_LEN]) -> Self {
        Self(digits)
    }
}

// Digits are secret; keep them out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() { f.write_str("Credential(unset)") } else { f.write_str("Credential(*****)") }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn unset_detection() {
        assert!(Credential::UNSET.is_unset());
        assert!(!Credential::new([0xFF, 0xFF, 0xFF, 0xFF, 0x00]).is_unset());
        assert!(!Credential::default().is_unset());
    }

    #[test]
    fn partial_match_is_counted() {
        let stored = Credential::new([1, 2, 3, 4, 5]);
        let candidate = Credential::new([1, 2, 3, 4, 6]);
        assert_eq!(stored.match_count(&candidate), 4);
        assert!(!stored.matches(&candidate));
    }

    #[test]
    fn from_slice_requires_five_bytes() {
        assert_eq!(Credential::from_slice(&[1, 2, 3, 4, 5]), Some(Credential::new([1, 2, 3, 4, 5])));
        assert_eq!(Credential::from_slice(&[1, 2, 3, 4]), None);
        assert_eq!(Credential::from_slice(&[1, 2, 3, 4, 5, 6]), None);
    }

    #[test]
    fn debug_hides_digits() {
        let shown = format!("{:?}", Credential::new([1, 2, 3, 4, 5]));
        assert!(!shown.contains('1'));
    }

    proptest! {
        #[test]
        fn full_count_iff_equal(a in any::<[u8; 5]>(), b in any::<[u8; 5]>()) {
            let (a, b) = (Credential::new(a), Credential::new(b));
            let count = a.match_count(&b);
            prop_assert!(count <= 5);
            prop_assert_eq!(count == 5, a == b);
        }

        #[test]
        fn count_equals_agreeing_positions(a in any::<[u8; 5]>(), flips in any::<[bool; 5]>()) {
            let mut b = a;
            for (digit, flip) in b.iter_mut().zip(flips) {
                if flip {
                    *digit = digit.wrapping_add(1);
                }
            }
            let expected = flips.iter().filter(|f| !**f).count() as u8;
            prop_assert_eq!(Credential::new(a).match_count(&Credential::new(b)), expected);
        }
    }
}

//! Keypad input and password capture.
//!
//! The 4x4 keypad reports digits 0-9 and the operators `+`, `-`, `*`, `/`,
//! `=`, `C`. Password entry only consumes digits; the main menu only reacts to
//! `+` and `-`. Anything else is ignored by whichever state receives it.

use doorlock_proto::{CREDENTIAL_LEN, Credential};

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Digit 0-9
    Digit(u8),
    /// `+`: change password
    Plus,
    /// `-`: open door
    Minus,
    /// Any other key, by its raw code
    Other(u8),
}

impl Key {
    /// Decode the value reported by the keypad scanner: `0..=9` for digits,
    /// ASCII for operators.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0..=9 => Self::Digit(raw),
            b'+' => Self::Plus,
            b'-' => Self::Minus,
            other => Self::Other(other),
        }
    }

    /// Decode a printable character, as typed into the simulator.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => c.to_digit(10).and_then(|d| u8::try_from(d).ok()).map(Self::Digit),
            '+' => Some(Self::Plus),
            '-' => Some(Self::Minus),
            '*' | '/' | '=' | 'C' | 'c' => u8::try_from(c).ok().map(Self::Other),
            _ => None,
        }
    }

    /// Digit value, if this is a digit key.
    pub fn digit(self) -> Option<u8> {
        match self {
            Self::Digit(d) => Some(d),
            _ => None,
        }
    }
}

/// Accumulates five digits into a credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordEntry {
    digits: [u8; CREDENTIAL_LEN],
    len: usize,
}

impl PasswordEntry {
    /// Empty entry.
    pub const fn new() -> Self {
        Self { digits: [0; CREDENTIAL_LEN], len: 0 }
    }

    /// Digits captured so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been typed yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add a digit. Returns the credential once the fifth digit arrives and
    /// starts over.
    pub fn push(&mut self, digit: u8) -> Option<Credential> {
        self.digits[self.len] = digit;
        self.len += 1;
        if self.len < CREDENTIAL_LEN {
            return None;
        }
        let credential = Credential::new(self.digits);
        self.clear();
        Some(credential)
    }

    /// Discard typed digits.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Progress through password capture and confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStep {
    /// Another digit captured
    Typing {
        /// Digits typed in the current entry
        typed: usize,
        /// Whether this is the confirmation entry
        confirming: bool,
    },
    /// First entry complete; confirmation starts
    FirstComplete,
    /// Both entries complete
    Done {
        /// The first entry, which is what gets saved
        credential: Credential,
        /// Positions where the two entries agree
        match_count: u8,
    },
}

impl CaptureStep {
    /// Whether a completed capture was confirmed on all five positions.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Done { match_count, .. } if *match_count as usize == CREDENTIAL_LEN)
    }
}

/// Captures a new password twice and compares the entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordCapture {
    first: Option<Credential>,
    entry: PasswordEntry,
}

impl PasswordCapture {
    /// Capture at the start of the first entry.
    pub const fn new() -> Self {
        Self { first: None, entry: PasswordEntry::new() }
    }

    /// Feed one digit.
    pub fn push(&mut self, digit: u8) -> CaptureStep {
        let confirming = self.first.is_some();
        let Some(entered) = self.entry.push(digit) else {
            return CaptureStep::Typing { typed: self.entry.len(), confirming };
        };

        match self.first.take() {
            None => {
                self.first = Some(entered);
                CaptureStep::FirstComplete
            },
            Some(first) => CaptureStep::Done { credential: first, match_count: first.match_count(&entered) },
        }
    }

    /// Start over from the first entry.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Capture both entries from a key sequence.
///
/// Non-digit keys are skipped. Returns `None` if the keys run out before both
/// entries are complete.
pub fn capture_and_confirm<I>(keys: I) -> Option<(Credential, u8)>
where
    I: IntoIterator<Item = Key>,
{
    let mut capture = PasswordCapture::new();
    keys.into_iter().filter_map(Key::digit).find_map(|digit| match capture.push(digit) {
        CaptureStep::Done { credential, match_count } => Some((credential, match_count)),
        _ => None,
    })
}

//! Byte-at-a-time message decoder.
//!
//! Mirrors how a UART delivers data: the caller pushes each received byte and
//! gets a [`Message`] back once a frame is complete.
//!
//! ```text
//! ┌──────┐  signal opcode          ┌──────┐
//! │ Idle │────────────────────────>│ Idle │  (emit Signal)
//! └──────┘                         └──────┘
//!    │ CHECK_PASSWORD / NEW_PASSWORD_TO_SAVE
//!    ↓
//! ┌────────────┐ 5th digit ┌──────┐
//! │ Collecting │──────────>│ Idle │  (emit credential message)
//! └────────────┘           └──────┘
//! ```
//!
//! The decoder knows nothing about time. Callers that enforce an inter-byte
//! timeout check [`Decoder::is_partial`] and call [`Decoder::reset`] when the
//! peer stalls mid-frame.

use crate::{
    credential::{CREDENTIAL_LEN, Credential},
    errors::{ProtocolError, Result},
    message::Message,
    opcodes::Opcode,
};

enum State {
    Idle,
    Collecting { opcode: Opcode, digits: [u8; CREDENTIAL_LEN], filled: usize },
}

/// Incremental decoder for the link byte stream.
pub struct Decoder {
    state: State,
}

impl Decoder {
    /// Create a decoder positioned at a message boundary.
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Process one received byte.
    ///
    /// Returns `Ok(Some(message))` when the byte completes a frame, `Ok(None)`
    /// while digits are still outstanding.
    ///
    /// # Errors
    ///
    /// `UnknownOpcode` if the byte sits at a message boundary and is not a
    /// known opcode. The decoder stays at the boundary.
    pub fn push(&mut self, byte: u8) -> Result<Option<Message>> {
        match &mut self.state {
            State::Idle => {
                let opcode = Opcode::try_from(byte)?;
                if opcode.carries_credential() {
                    self.state =
                        State::Collecting { opcode, digits: [0; CREDENTIAL_LEN], filled: 0 };
                    Ok(None)
                } else {
                    Ok(Some(Message::Signal(opcode)))
                }
            },
            State::Collecting { opcode, digits, filled } => {
                digits[*filled] = byte;
                *filled += 1;
                if *filled < CREDENTIAL_LEN {
                    return Ok(None);
                }

                let opcode = *opcode;
                let credential = Credential::new(*digits);
                self.state = State::Idle;
                Ok(Message::with_credential(opcode, credential))
            },
        }
    }

    /// Whether a password frame has started but not finished.
    pub fn is_partial(&self) -> bool {
        matches!(self.state, State::Collecting { .. })
    }

    /// Discard any partial frame.
    ///
    /// Returns the error describing what was dropped, if anything was.
    pub fn reset(&mut self) -> Option<ProtocolError> {
        let dropped = match self.state {
            State::Idle => None,
            State::Collecting { opcode, filled, .. } => {
                Some(ProtocolError::Truncated { opcode, expected: CREDENTIAL_LEN, actual: filled })
            },
        };
        self.state = State::Idle;
        dropped
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

//! Protocol error types.

use thiserror::Error;

use crate::opcodes::Opcode;

/// Result alias for wire-format operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while decoding bytes from the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The byte at a message boundary is not a known opcode.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// A password message ended before all digits arrived.
    #[error("{opcode:?} truncated: expected {expected} digits, got {actual}")]
    Truncated {
        /// Header of the partial message
        opcode: Opcode,
        /// Digits required by the frame
        expected: usize,
        /// Digits actually received
        actual: usize,
    },

    /// A slice held more bytes than the single message it was decoded as.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// The slice was empty.
    #[error("empty input")]
    Empty,
}

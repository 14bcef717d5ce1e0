//! Opcode byte values.
//!
//! These are fixed by the deployed firmware and must never be renumbered.

use crate::errors::ProtocolError;

/// Every byte value with a meaning on the link.
///
/// The enum covers requests (HMI → Control), replies (Control → HMI) and the
/// two signals used in both directions ([`Opcode::Ready`], [`Opcode::Error`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Desynchronization reject. Sent by either node, never answered.
    Error = 0x00,
    /// Sender ready / acknowledge. Opens every exchange.
    Ready = 0x10,
    /// Write-and-verify of a new credential failed.
    PasswordNotSaved = 0x11,
    /// Storage holds no credential yet (first boot).
    NoPreviousPassword = 0x20,
    /// Five digits follow; store them as the credential.
    NewPasswordToSave = 0x21,
    /// Write-and-verify of a new credential succeeded.
    PasswordSaved = 0x22,
    /// Storage already holds a credential.
    PreviousPasswordDetected = 0x23,
    /// Begin the change-password flow.
    OverwritePassword = 0x30,
    /// Begin the door flow.
    DoorManipulation = 0x40,
    /// Five digits follow; verify them against the stored credential.
    CheckPassword = 0x41,
    /// Candidate matched.
    CorrectPassword = 0x42,
    /// Candidate did not match; another attempt is allowed.
    IncorrectPassword = 0x43,
    /// Third consecutive mismatch; lockout triggered.
    Wrong3Times = 0x44,
    /// Drive the actuator in the open direction.
    DoorOpen = 0x45,
    /// Drive the actuator in the close direction.
    DoorClose = 0x46,
}

impl Opcode {
    /// All opcodes, in byte order.
    pub const ALL: [Self; 15] = [
        Self::Error,
        Self::Ready,
        Self::PasswordNotSaved,
        Self::NoPreviousPassword,
        Self::NewPasswordToSave,
        Self::PasswordSaved,
        Self::PreviousPasswordDetected,
        Self::OverwritePassword,
        Self::DoorManipulation,
        Self::CheckPassword,
        Self::CorrectPassword,
        Self::IncorrectPassword,
        Self::Wrong3Times,
        Self::DoorOpen,
        Self::DoorClose,
    ];

    /// Convert from the raw byte, if it is a known opcode.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Error),
            0x10 => Some(Self::Ready),
            0x11 => Some(Self::PasswordNotSaved),
            0x20 => Some(Self::NoPreviousPassword),
            0x21 => Some(Self::NewPasswordToSave),
            0x22 => Some(Self::PasswordSaved),
            0x23 => Some(Self::PreviousPasswordDetected),
            0x30 => Some(Self::OverwritePassword),
            0x40 => Some(Self::DoorManipulation),
            0x41 => Some(Self::CheckPassword),
            0x42 => Some(Self::CorrectPassword),
            0x43 => Some(Self::IncorrectPassword),
            0x44 => Some(Self::Wrong3Times),
            0x45 => Some(Self::DoorOpen),
            0x46 => Some(Self::DoorClose),
            _ => None,
        }
    }

    /// The byte sent on the wire.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Whether a credential (five digit bytes) follows this opcode.
    pub fn carries_credential(self) -> bool {
        matches!(self, Self::CheckPassword | Self::NewPasswordToSave)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, ProtocolError> {
        Self::from_u8(byte).ok_or(ProtocolError::UnknownOpcode(byte))
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        opcode.to_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_all_opcodes() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_u8(opcode.to_u8()), Some(opcode));
        }
    }

    #[test]
    fn unknown_bytes_rejected() {
        for byte in 0..=u8::MAX {
            let known = Opcode::ALL.iter().any(|op| op.to_u8() == byte);
            assert_eq!(Opcode::from_u8(byte).is_some(), known, "byte 0x{byte:02x}");
        }
        assert_eq!(Opcode::try_from(0x99), Err(ProtocolError::UnknownOpcode(0x99)));
    }

    #[test]
    fn only_password_messages_carry_digits() {
        let carrying: Vec<_> = Opcode::ALL.into_iter().filter(|op| op.carries_credential()).collect();
        assert_eq!(carrying, vec![Opcode::NewPasswordToSave, Opcode::CheckPassword]);
    }

    #[test]
    fn firmware_byte_values() {
        assert_eq!(u8::from(Opcode::Ready), 0x10);
        assert_eq!(u8::from(Opcode::PasswordNotSaved), 0x11);
        assert_eq!(u8::from(Opcode::Wrong3Times), 0x44);
        assert_eq!(u8::from(Opcode::DoorClose), 0x46);
    }
}

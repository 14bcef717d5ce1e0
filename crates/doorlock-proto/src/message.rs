//! Typed messages and their byte encoding.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    credential::{CREDENTIAL_LEN, Credential},
    errors::{ProtocolError, Result},
    opcodes::Opcode,
};

/// One complete message on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// A single opcode byte with no payload.
    Signal(Opcode),
    /// `CHECK_PASSWORD` followed by the candidate digits.
    CheckPassword(Credential),
    /// `NEW_PASSWORD_TO_SAVE` followed by the digits to store.
    NewPassword(Credential),
}

impl Message {
    /// The opcode heading this message.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Signal(opcode) => *opcode,
            Self::CheckPassword(_) => Opcode::CheckPassword,
            Self::NewPassword(_) => Opcode::NewPasswordToSave,
        }
    }

    /// The credential payload, if any.
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Signal(_) => None,
            Self::CheckPassword(c) | Self::NewPassword(c) => Some(c),
        }
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Signal(_) => 1,
            Self::CheckPassword(_) | Self::NewPassword(_) => 1 + CREDENTIAL_LEN,
        }
    }

    /// Append the wire bytes to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u8(self.opcode().to_u8());
        if let Some(credential) = self.credential() {
            dst.put_slice(credential.digits());
        }
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode exactly one message from `bytes`.
    ///
    /// Signal opcodes that carry a credential in the other direction are not
    /// a concern here: the header alone decides the frame length.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&head, rest) = bytes.split_first().ok_or(ProtocolError::Empty)?;
        let opcode = Opcode::try_from(head)?;

        if !opcode.carries_credential() {
            return match rest.len() {
                0 => Ok(Self::Signal(opcode)),
                n => Err(ProtocolError::TrailingBytes(n)),
            };
        }

        if rest.len() < CREDENTIAL_LEN {
            return Err(ProtocolError::Truncated {
                opcode,
                expected: CREDENTIAL_LEN,
                actual: rest.len(),
            });
        }
        if rest.len() > CREDENTIAL_LEN {
            return Err(ProtocolError::TrailingBytes(rest.len() - CREDENTIAL_LEN));
        }

        let credential = Credential::from_slice(rest).ok_or(ProtocolError::Truncated {
            opcode,
            expected: CREDENTIAL_LEN,
            actual: rest.len(),
        })?;
        Ok(Self::with_credential(opcode, credential).unwrap_or(Self::Signal(opcode)))
    }

    /// Build the credential-bearing message for `opcode`.
    pub(crate) fn with_credential(opcode: Opcode, credential: Credential) -> Option<Self> {
        match opcode {
            Opcode::CheckPassword => Some(Self::CheckPassword(credential)),
            Opcode::NewPasswordToSave => Some(Self::NewPassword(credential)),
            _ => None,
        }
    }
}

impl From<Opcode> for Message {
    fn from(opcode: Opcode) -> Self {
        Self::Signal(opcode)
    }
}

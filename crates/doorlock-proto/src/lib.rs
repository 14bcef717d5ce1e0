//! Wire format for the door-lock UART link.
//!
//! The link between the HMI and Control nodes is a half-duplex byte stream
//! (9600 baud, 8-N-1). Every message is a single opcode byte; the two
//! password-bearing opcodes are followed by exactly [`CREDENTIAL_LEN`] digit
//! bytes with no length prefix.
//!
//! ```text
//! ┌────────┐                       ┌────────────────────────────┐
//! │ opcode │   signal              │ opcode │ d0 d1 d2 d3 d4    │  password message
//! └────────┘                       └────────────────────────────┘
//! ```
//!
//! Decoding is incremental: [`Decoder`] consumes one byte at a time, the way a
//! UART receive register delivers them, and yields a [`Message`] once the last
//! byte of a frame has arrived.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credential;
pub mod decoder;
pub mod errors;
pub mod message;
pub mod opcodes;

pub use credential::{CREDENTIAL_LEN, Credential};
pub use decoder::Decoder;
pub use errors::{ProtocolError, Result};
pub use message::Message;
pub use opcodes::Opcode;

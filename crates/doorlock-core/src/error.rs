//! Faults recorded by the node state machines.
//!
//! Nodes recover from every fault on their own (reject, resync, fall back);
//! the error values are kept so drivers and tests can see what happened.

use doorlock_proto::{Opcode, ProtocolError};
use thiserror::Error;

use crate::storage::StorageError;

/// Fault observed by the Control node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// A well-formed message arrived that is not valid in the current state.
    #[error("unexpected {opcode:?} while {state}")]
    Unexpected {
        /// Opcode received
        opcode: Opcode,
        /// State it arrived in
        state: &'static str,
    },

    /// Undecodable bytes or a truncated frame.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The credential storage transport failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The peer stopped sending in the middle of an exchange.
    #[error("peer silent for {elapsed} ticks while {state}")]
    Timeout {
        /// Ticks waited
        elapsed: u32,
        /// State that timed out
        state: &'static str,
    },

    /// The peer rejected our last message.
    #[error("peer reported a protocol error")]
    PeerRejected,
}

/// Fault observed by the HMI node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HmiError {
    /// A reply that is not valid in the current state.
    #[error("unexpected {opcode:?} while {state}")]
    Unexpected {
        /// Opcode received
        opcode: Opcode,
        /// State it arrived in
        state: &'static str,
    },

    /// Undecodable byte from the peer.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No reply within the reply timeout.
    #[error("no reply after {elapsed} ticks while {state}")]
    Timeout {
        /// Ticks waited
        elapsed: u32,
        /// State that timed out
        state: &'static str,
    },

    /// The peer rejected our last message.
    #[error("peer reported a protocol error")]
    PeerRejected,

    /// Local and peer attempt counters disagree about a lockout.
    #[error("attempt counters diverged: local {local} failures, peer replied {reply:?}")]
    CounterMismatch {
        /// Local consecutive failures before the reply
        local: u8,
        /// Reply from Control
        reply: Opcode,
    },
}

//! One direction of the UART, with seeded fault injection.
//!
//! At 9600 baud a byte takes about a millisecond, far below the one-second
//! tick, so delivery is modeled as FIFO with no latency. Faults are decided per
//! byte at send time from a ChaCha stream; the same seed always damages the
//! same bytes.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Per-byte fault probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkFaults {
    /// Probability a byte is lost
    pub drop_rate: f64,
    /// Probability a delivered byte has bits flipped
    pub corrupt_rate: f64,
}

impl LinkFaults {
    /// A perfect link.
    pub const NONE: Self = Self { drop_rate: 0.0, corrupt_rate: 0.0 };

    /// Lose bytes at `rate`.
    pub fn lossy(rate: f64) -> Self {
        Self { drop_rate: rate, ..Self::NONE }
    }

    /// Corrupt bytes at `rate`.
    pub fn noisy(rate: f64) -> Self {
        Self { corrupt_rate: rate, ..Self::NONE }
    }

    fn is_clean(&self) -> bool {
        self.drop_rate <= 0.0 && self.corrupt_rate <= 0.0
    }
}

/// What happened to a damaged byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Never arrived
    Dropped(u8),
    /// Arrived with a different value
    Corrupted {
        /// Value sent
        sent: u8,
        /// Value delivered
        delivered: u8,
    },
}

/// A simulated UART direction.
#[derive(Debug, Clone)]
pub struct SimLink {
    queue: VecDeque<u8>,
    faults: LinkFaults,
    rng: ChaCha8Rng,
    sent: usize,
    damaged: usize,
}

impl SimLink {
    /// Link with the given fault profile and seed.
    pub fn new(faults: LinkFaults, seed: u64) -> Self {
        Self { queue: VecDeque::new(), faults, rng: ChaCha8Rng::seed_from_u64(seed), sent: 0, damaged: 0 }
    }

    /// A perfect link.
    pub fn clean() -> Self {
        Self::new(LinkFaults::NONE, 0)
    }

    /// Transmit a byte, possibly damaging it.
    pub fn send(&mut self, byte: u8) -> Option<Fault> {
        self.sent += 1;
        if self.faults.is_clean() {
            self.queue.push_back(byte);
            return None;
        }

        if self.rng.gen_bool(self.faults.drop_rate.clamp(0.0, 1.0)) {
            self.damaged += 1;
            tracing::debug!(byte, "link dropped byte");
            return Some(Fault::Dropped(byte));
        }
        if self.rng.gen_bool(self.faults.corrupt_rate.clamp(0.0, 1.0)) {
            let mask: u8 = self.rng.gen_range(1..=u8::MAX);
            let delivered = byte ^ mask;
            self.damaged += 1;
            self.queue.push_back(delivered);
            tracing::debug!(sent = byte, delivered, "link corrupted byte");
            return Some(Fault::Corrupted { sent: byte, delivered });
        }
        self.queue.push_back(byte);
        None
    }

    /// Place a byte on the wire as-is, bypassing fault injection.
    pub fn inject(&mut self, byte: u8) {
        self.queue.push_back(byte);
    }

    /// Next byte at the receiver.
    pub fn recv(&mut self) -> Option<u8> {
        self.queue.pop_front()
    }

    /// Whether nothing is in flight.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Bytes transmitted (injected bytes excluded).
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Bytes dropped or corrupted.
    pub fn damaged(&self) -> usize {
        self.damaged
    }
}

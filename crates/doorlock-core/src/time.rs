//! Elapsed-seconds ticks and fixed-length timing windows.
//!
//! Each node owns one [`TickCounter`], advanced once per second from the timer
//! interrupt (or a timer task) and read by the main loop as a snapshot. The two
//! nodes' counters are never synchronized; every window is measured against
//! the local counter only.
//!
//! All arithmetic wraps, so a window that straddles counter overflow still
//! lasts exactly its length.

use std::{
    fmt,
    sync::atomic::{AtomicU32, Ordering},
};

/// A snapshot of the elapsed-seconds counter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u32);

impl Tick {
    /// Ticks elapsed from `earlier` to `self`, modulo counter width.
    pub fn since(self, earlier: Tick) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// The tick `n` seconds after `self`.
    pub fn offset(self, n: u32) -> Tick {
        Tick(self.0.wrapping_add(n))
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A timed action: starts at a captured tick and lasts `length` ticks.
///
/// The action is active while `now < start + length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: Tick,
    length: u32,
}

impl Window {
    /// Capture `now` as the start of a window of `length` ticks.
    pub fn start(now: Tick, length: u32) -> Self {
        Self { start: now, length }
    }

    /// Tick the window was opened at.
    pub fn started_at(&self) -> Tick {
        self.start
    }

    /// First tick outside the window.
    pub fn ends_at(&self) -> Tick {
        self.start.offset(self.length)
    }

    /// Whether `now` still falls inside the window.
    pub fn is_active(&self, now: Tick) -> bool {
        now.since(self.start) < self.length
    }

    /// Ticks elapsed since the window opened, capped at its length.
    pub fn elapsed(&self, now: Tick) -> u32 {
        now.since(self.start).min(self.length)
    }

    /// Ticks left before the window closes.
    pub fn remaining(&self, now: Tick) -> u32 {
        self.length - self.elapsed(now)
    }
}

/// Single-writer elapsed-seconds counter shared between the tick source and
/// the main loop.
///
/// `advance` is the only writer. The counter is 32 bits wide so reads and
/// increments need an atomic rather than relying on a single-byte access.
#[derive(Debug, Default)]
pub struct TickCounter {
    ticks: AtomicU32,
}

impl TickCounter {
    /// Counter starting at zero.
    pub const fn new() -> Self {
        Self { ticks: AtomicU32::new(0) }
    }

    /// Record one elapsed second. Call from the tick source only.
    pub fn advance(&self) -> Tick {
        Tick(self.ticks.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
    }

    /// Read-only snapshot for the main loop.
    pub fn now(&self) -> Tick {
        Tick(self.ticks.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_covers_half_open_range() {
        let window = Window::start(Tick(5), 10);
        assert!(!window.is_active(Tick(4)));
        for t in 5..15 {
            assert!(window.is_active(Tick(t)), "tick {t} should be inside");
        }
        assert!(!window.is_active(Tick(15)));
        assert_eq!(window.ends_at(), Tick(15));
    }

    #[test]
    fn window_survives_counter_wrap() {
        let window = Window::start(Tick(u32::MAX - 2), 10);
        assert!(window.is_active(Tick(u32::MAX)));
        assert!(window.is_active(Tick(6)));
        assert!(!window.is_active(Tick(7)));
        assert_eq!(window.elapsed(Tick(3)), 6);
    }

    #[test]
    fn elapsed_is_capped() {
        let window = Window::start(Tick(0), 60);
        assert_eq!(window.elapsed(Tick(30)), 30);
        assert_eq!(window.elapsed(Tick(90)), 60);
        assert_eq!(window.remaining(Tick(45)), 15);
        assert_eq!(window.remaining(Tick(90)), 0);
    }

    #[test]
    fn counter_advances_monotonically() {
        let counter = TickCounter::new();
        assert_eq!(counter.now(), Tick(0));
        assert_eq!(counter.advance(), Tick(1));
        assert_eq!(counter.advance(), Tick(2));
        assert_eq!(counter.now(), Tick(2));
    }
}

//! Door actuator sequencing.
//!
//! ```text
//! ┌──────┐ open_door ┌─────────┐ window over ┌─────────────┐ close_door ┌─────────┐ window over ┌──────┐
//! │ Idle │──────────>│ Opening │────────────>│ HoldingOpen │───────────>│ Closing │────────────>│ Idle │
//! └──────┘           └─────────┘             └─────────────┘            └─────────┘             └──────┘
//! ```
//!
//! The actuator keeps its open drive after the open window: no stop is issued
//! at that boundary, the close phase supersedes it. Only the end of the close
//! window stops the motor.

use crate::time::{Tick, Window};

/// Drive applied to the door motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Motor off.
    #[default]
    Stop,
    /// Clockwise: opening.
    Open,
    /// Anticlockwise: closing.
    Close,
}

/// Where the door is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorPhase {
    /// Motor stopped, no cycle in progress.
    Idle,
    /// Driving open for the open window.
    Opening(Window),
    /// Open window over; still driving open until the close phase starts.
    HoldingOpen {
        /// Tick the open window ended at
        since: Tick,
    },
    /// Driving closed for the close window.
    Closing(Window),
}

/// Phase transitions reported by [`DoorSequencer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorEvent {
    /// The open window has elapsed.
    OpenElapsed {
        /// First tick after the window, however late the tick that noticed it
        at: Tick,
    },
    /// The close window has elapsed and the motor was stopped.
    Closed,
}

/// Runs one open/close cycle against the local tick counter.
#[derive(Debug, Clone)]
pub struct DoorSequencer {
    phase: DoorPhase,
    direction: Direction,
    open_window: u32,
    close_window: u32,
}

impl DoorSequencer {
    /// Sequencer with the given window lengths in ticks.
    pub fn new(open_window: u32, close_window: u32) -> Self {
        Self { phase: DoorPhase::Idle, direction: Direction::Stop, open_window, close_window }
    }

    /// Current phase.
    pub fn phase(&self) -> DoorPhase {
        self.phase
    }

    /// Drive currently applied to the motor.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether a timed window is running (no other work may be serviced).
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, DoorPhase::Opening(_) | DoorPhase::Closing(_))
    }

    /// Start driving open at `now`. Returns the new drive.
    pub fn open_door(&mut self, now: Tick) -> Direction {
        self.phase = DoorPhase::Opening(Window::start(now, self.open_window));
        self.direction = Direction::Open;
        self.direction
    }

    /// Start driving closed at `now`. Returns the new drive.
    pub fn close_door(&mut self, now: Tick) -> Direction {
        self.phase = DoorPhase::Closing(Window::start(now, self.close_window));
        self.direction = Direction::Close;
        self.direction
    }

    /// Advance to `now`, reporting a window boundary if one was crossed.
    pub fn tick(&mut self, now: Tick) -> Option<DoorEvent> {
        match self.phase {
            DoorPhase::Opening(window) if !window.is_active(now) => {
                let at = window.ends_at();
                self.phase = DoorPhase::HoldingOpen { since: at };
                Some(DoorEvent::OpenElapsed { at })
            },
            DoorPhase::Closing(window) if !window.is_active(now) => {
                self.phase = DoorPhase::Idle;
                self.direction = Direction::Stop;
                Some(DoorEvent::Closed)
            },
            _ => None,
        }
    }
}

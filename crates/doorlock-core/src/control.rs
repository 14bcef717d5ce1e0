//! Control node: credential store and enforcement.
//!
//! # Architecture: Action-Based State Machine
//!
//! The node never touches the UART, motor or buzzer. Received bytes and
//! ticks go in; [`ControlAction`]s come out for the driver to execute. Only
//! credential storage is called directly, since its results decide the reply.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐ READY  ┌───────────────┐ READY ┌─────────────────┐ OVERWRITE / DOOR ┌───────────┐
//! │ Booting │───────>│ AwaitingReady │──────>│ AwaitingCommand │─────────────────>│ Verifying │
//! └─────────┘        └───────────────┘       └─────────────────┘                  └───────────┘
//!      │ empty               ↑                                                 CORRECT │   │ WRONG_3_TIMES
//!      ↓                     │                       ┌─────────────────────────────────┘   ↓
//! ┌─────────────────────┐    │  saved       ┌───────────────────────────────┐        ┌───────┐
//! │ AwaitingNewPassword │────┘<─────────────│ AwaitingNewPassword / Door... │        │ Alarm │
//! └─────────────────────┘                   └───────────────────────────────┘        └───────┘
//! ```
//!
//! Door cycle: `AwaitingDoorCommand` → `DoorOpening` → `AwaitingDoorClose` →
//! `DoorClosing` → idle. After an alarm the node returns to `Verifying` for the
//! interrupted flow (lockout recovery) until a check succeeds.
//!
//! While a door window or the alarm runs, received bytes are queued and
//! replayed in order once the window ends.

use std::collections::VecDeque;

use doorlock_proto::{CREDENTIAL_LEN, Credential, Decoder, Message, Opcode};
use embedded_hal::delay::DelayNs;

use crate::{
    Flow,
    config::TimingConfig,
    credential::CredentialStore,
    door::{Direction, DoorEvent, DoorSequencer},
    error::ControlError,
    storage::ByteStorage,
    time::{Tick, Window},
    verify::{LockoutGuard, Verdict},
};

/// Effects requested by the Control node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    /// Transmit this message to the HMI
    Send(Message),
    /// Apply this drive to the door motor
    Actuate(Direction),
    /// Switch the alarm buzzer on or off
    Buzzer(bool),
}

/// Control node state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Waiting for the HMI's first READY to report storage status
    Booting,
    /// Idle; discarding everything except READY
    AwaitingReady,
    /// READY received; next byte is a command
    AwaitingCommand,
    /// Waiting for CHECK_PASSWORD for this flow
    Verifying(Flow),
    /// Waiting for NEW_PASSWORD_TO_SAVE
    AwaitingNewPassword {
        /// Storage is still unseeded
        first_boot: bool,
    },
    /// Password accepted; waiting for DOOR_OPEN
    AwaitingDoorCommand,
    /// Open window running
    DoorOpening,
    /// Open window over; holding open until DOOR_CLOSE
    AwaitingDoorClose {
        /// Tick the open window ended
        since: Tick,
    },
    /// Close window running
    DoorClosing,
    /// Lockout alarm running for this flow
    Alarm(Flow),
}

impl ControlState {
    /// Short name for logs and error values.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Booting => "booting",
            Self::AwaitingReady => "awaiting ready",
            Self::AwaitingCommand => "awaiting command",
            Self::Verifying(_) => "verifying",
            Self::AwaitingNewPassword { .. } => "awaiting new password",
            Self::AwaitingDoorCommand => "awaiting door command",
            Self::DoorOpening => "door opening",
            Self::AwaitingDoorClose { .. } => "awaiting door close",
            Self::DoorClosing => "door closing",
            Self::Alarm(_) => "alarm",
        }
    }
}

/// The Control node.
pub struct ControlNode<S, D> {
    state: ControlState,
    store: CredentialStore<S, D>,
    guard: LockoutGuard,
    recovery: Option<Flow>,
    needs_seed: bool,
    door: DoorSequencer,
    alarm: Option<Window>,
    decoder: Decoder,
    last_byte: Tick,
    deferred: VecDeque<u8>,
    config: TimingConfig,
    last_fault: Option<ControlError>,
    faults: usize,
}

impl<S: ByteStorage, D: DelayNs> ControlNode<S, D> {
    /// Create a node in the `Booting` state.
    pub fn new(store: CredentialStore<S, D>, config: TimingConfig) -> Self {
        Self {
            state: ControlState::Booting,
            store,
            guard: LockoutGuard::new(),
            recovery: None,
            needs_seed: false,
            door: DoorSequencer::new(config.door_open_window, config.door_close_window),
            alarm: None,
            decoder: Decoder::new(),
            last_byte: Tick::default(),
            deferred: VecDeque::new(),
            config,
            last_fault: None,
            faults: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Drive currently applied to the door motor.
    pub fn actuator(&self) -> Direction {
        self.door.direction()
    }

    /// Whether the buzzer is sounding.
    pub fn buzzer(&self) -> bool {
        self.alarm.is_some()
    }

    /// Whether the lockout flag is raised.
    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }

    /// Consecutive failed checks.
    pub fn failures(&self) -> u8 {
        self.guard.failures()
    }

    /// Most recent fault, if any.
    pub fn last_fault(&self) -> Option<&ControlError> {
        self.last_fault.as_ref()
    }

    /// Faults recorded since start.
    pub fn fault_count(&self) -> usize {
        self.faults
    }

    /// Bytes waiting for the current window to end.
    pub fn deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Credential store.
    pub fn store(&self) -> &CredentialStore<S, D> {
        &self.store
    }

    /// Credential store, mutably (fault injection in tests).
    pub fn store_mut(&mut self) -> &mut CredentialStore<S, D> {
        &mut self.store
    }

    /// Process one byte from the UART.
    pub fn handle_byte(&mut self, byte: u8, now: Tick) -> Vec<ControlAction> {
        if self.is_busy() {
            tracing::trace!(byte, state = self.state.name(), "deferred");
            self.deferred.push_back(byte);
            return Vec::new();
        }
        self.process_byte(byte, now)
    }

    /// Advance to `now`: end windows, enforce timeouts.
    pub fn tick(&mut self, now: Tick) -> Vec<ControlAction> {
        let mut actions = Vec::new();

        match self.state {
            ControlState::DoorOpening => {
                if let Some(DoorEvent::OpenElapsed { at }) = self.door.tick(now) {
                    self.transition(ControlState::AwaitingDoorClose { since: at });
                    actions.extend(self.drain_deferred(now));
                }
            },
            ControlState::AwaitingDoorClose { since } => {
                let elapsed = now.since(since);
                if elapsed >= self.config.reply_timeout {
                    tracing::warn!(elapsed, "no DOOR_CLOSE from peer, closing anyway");
                    self.record(ControlError::Timeout { elapsed, state: self.state.name() });
                    actions.extend(self.close_door(now));
                }
            },
            ControlState::DoorClosing => {
                if let Some(DoorEvent::Closed) = self.door.tick(now) {
                    tracing::info!("door cycle complete");
                    actions.push(ControlAction::Actuate(Direction::Stop));
                    self.transition(self.idle_state());
                    actions.extend(self.drain_deferred(now));
                }
            },
            ControlState::Alarm(_) => {
                if self.alarm.is_some_and(|window| !window.is_active(now)) {
                    tracing::info!("alarm window over, awaiting recovery check");
                    self.alarm = None;
                    actions.push(ControlAction::Buzzer(false));
                    self.transition(self.idle_state());
                    actions.extend(self.drain_deferred(now));
                }
            },
            _ => {
                let elapsed = now.since(self.last_byte);
                if self.decoder.is_partial() && elapsed >= self.config.byte_timeout {
                    tracing::warn!(elapsed, "password message stalled");
                    actions.extend(
                        self.reject(ControlError::Timeout { elapsed, state: self.state.name() }),
                    );
                }
            },
        }

        actions
    }

    fn is_busy(&self) -> bool {
        matches!(
            self.state,
            ControlState::DoorOpening | ControlState::DoorClosing | ControlState::Alarm(_)
        )
    }

    fn process_byte(&mut self, byte: u8, now: Tick) -> Vec<ControlAction> {
        let ready = byte == Opcode::Ready.to_u8();
        match self.state {
            ControlState::Booting if ready => return self.report_storage_status(),
            ControlState::AwaitingReady if ready => {
                self.transition(ControlState::AwaitingCommand);
                return Vec::new();
            },
            ControlState::Booting | ControlState::AwaitingReady => {
                tracing::trace!(byte, state = self.state.name(), "discarded while waiting for READY");
                return Vec::new();
            },
            _ => {},
        }

        self.last_byte = now;
        match self.decoder.push(byte) {
            Ok(Some(message)) => self.dispatch(message, now),
            Ok(None) => Vec::new(),
            Err(err) => self.reject(err.into()),
        }
    }

    fn dispatch(&mut self, message: Message, now: Tick) -> Vec<ControlAction> {
        use ControlState as S;
        use Message::{CheckPassword, NewPassword, Signal};

        match (self.state, message) {
            (_, Signal(Opcode::Error)) => {
                tracing::warn!(state = self.state.name(), "peer rejected exchange");
                self.record(ControlError::PeerRejected);
                self.abort();
                Vec::new()
            },
            // A second READY with no command in between: the HMI is (re)booting
            (S::AwaitingCommand, Signal(Opcode::Ready)) => self.report_storage_status(),
            (S::AwaitingCommand, Signal(Opcode::OverwritePassword)) => {
                self.transition(S::Verifying(Flow::ChangePassword));
                Vec::new()
            },
            (S::AwaitingCommand, Signal(Opcode::DoorManipulation)) => {
                self.transition(S::Verifying(Flow::Door));
                Vec::new()
            },
            (S::Verifying(flow), CheckPassword(candidate)) => self.verify(flow, &candidate, now),
            (S::AwaitingNewPassword { .. }, NewPassword(credential)) => self.save(&credential),
            (S::AwaitingNewPassword { first_boot: true }, Signal(Opcode::Ready)) => {
                // Boot status reply was lost; repeat it
                vec![ControlAction::Send(Message::Signal(Opcode::NoPreviousPassword))]
            },
            (S::AwaitingDoorCommand, Signal(Opcode::DoorOpen)) => self.open_door(now),
            (S::AwaitingDoorCommand | S::AwaitingDoorClose { .. }, Signal(Opcode::DoorClose)) => {
                self.close_door(now)
            },
            (S::AwaitingDoorClose { .. }, other) => {
                // The HMI has moved on; finish the cycle first, then replay
                self.requeue_front(&other);
                self.close_door(now)
            },
            (_, Signal(Opcode::Ready)) if self.guard.is_locked() => {
                tracing::debug!("READY ignored during lockout recovery");
                Vec::new()
            },
            (state, Signal(Opcode::Ready)) => {
                tracing::debug!(state = state.name(), "READY mid-flow, starting new exchange");
                self.transition(S::AwaitingCommand);
                Vec::new()
            },
            (state, message) => {
                self.reject(ControlError::Unexpected { opcode: message.opcode(), state: state.name() })
            },
        }
    }

    fn report_storage_status(&mut self) -> Vec<ControlAction> {
        match self.store.is_empty() {
            Ok(true) => {
                tracing::info!("no credential stored, awaiting first password");
                self.needs_seed = true;
                self.transition(ControlState::AwaitingNewPassword { first_boot: true });
                vec![ControlAction::Send(Message::Signal(Opcode::NoPreviousPassword))]
            },
            Ok(false) => {
                tracing::info!("stored credential detected");
                self.transition(ControlState::AwaitingReady);
                vec![ControlAction::Send(Message::Signal(Opcode::PreviousPasswordDetected))]
            },
            Err(err) => {
                tracing::warn!(%err, "storage unreadable at boot");
                self.record(err.into());
                vec![ControlAction::Send(Message::Signal(Opcode::Error))]
            },
        }
    }

    fn verify(&mut self, flow: Flow, candidate: &Credential, now: Tick) -> Vec<ControlAction> {
        let count = match self.store.compare_credential(candidate) {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(%err, "credential read failed during verification");
                return self.reject(err.into());
            },
        };

        match self.guard.evaluate(count) {
            Verdict::Matched => {
                tracing::info!(?flow, "password accepted");
                self.recovery = None;
                self.transition(match flow {
                    Flow::ChangePassword => ControlState::AwaitingNewPassword { first_boot: false },
                    Flow::Door => ControlState::AwaitingDoorCommand,
                });
                reply(Opcode::CorrectPassword)
            },
            Verdict::RetryAllowed { remaining } => {
                tracing::debug!(?flow, remaining, "password rejected");
                reply(Opcode::IncorrectPassword)
            },
            Verdict::LockedOut => {
                tracing::warn!(?flow, "third consecutive wrong password, raising alarm");
                self.recovery = Some(flow);
                self.alarm = Some(Window::start(now, self.config.alarm_window));
                self.transition(ControlState::Alarm(flow));
                let mut actions = reply(Opcode::Wrong3Times);
                actions.push(ControlAction::Buzzer(true));
                actions
            },
        }
    }

    fn save(&mut self, credential: &Credential) -> Vec<ControlAction> {
        let written = self
            .store
            .write_credential(credential)
            .and_then(|()| self.store.compare_credential(credential));

        let result = match written {
            Ok(count) if count as usize == CREDENTIAL_LEN => {
                tracing::info!("credential saved");
                self.needs_seed = false;
                Opcode::PasswordSaved
            },
            Ok(count) => {
                tracing::warn!(count, "read-back mismatch after write");
                Opcode::PasswordNotSaved
            },
            Err(err) => {
                tracing::warn!(%err, "credential write failed");
                self.record(err.into());
                Opcode::PasswordNotSaved
            },
        };

        self.transition(self.idle_state());
        reply(result)
    }

    fn open_door(&mut self, now: Tick) -> Vec<ControlAction> {
        self.flush_partial();
        let direction = self.door.open_door(now);
        self.transition(ControlState::DoorOpening);
        vec![ControlAction::Actuate(direction)]
    }

    fn close_door(&mut self, now: Tick) -> Vec<ControlAction> {
        // Nothing started before the close window may complete after it
        self.flush_partial();
        let direction = self.door.close_door(now);
        self.transition(ControlState::DoorClosing);
        vec![ControlAction::Actuate(direction)]
    }

    /// Where the node rests between exchanges.
    fn idle_state(&self) -> ControlState {
        if let Some(flow) = self.recovery {
            ControlState::Verifying(flow)
        } else if self.needs_seed {
            ControlState::AwaitingNewPassword { first_boot: true }
        } else {
            ControlState::AwaitingReady
        }
    }

    /// Desync: answer ERROR, flush, go idle.
    fn reject(&mut self, error: ControlError) -> Vec<ControlAction> {
        tracing::warn!(%error, "rejecting exchange");
        self.record(error);
        self.abort();
        vec![ControlAction::Send(Message::Signal(Opcode::Error))]
    }

    fn abort(&mut self) {
        self.flush_partial();
        self.transition(self.idle_state());
    }

    fn flush_partial(&mut self) {
        if let Some(dropped) = self.decoder.reset() {
            tracing::debug!(%dropped, state = self.state.name(), "partial message discarded");
        }
    }

    fn requeue_front(&mut self, message: &Message) {
        for byte in message.to_bytes().iter().rev() {
            self.deferred.push_front(*byte);
        }
    }

    fn drain_deferred(&mut self, now: Tick) -> Vec<ControlAction> {
        let mut actions = Vec::new();
        while !self.is_busy() {
            let Some(byte) = self.deferred.pop_front() else { break };
            actions.extend(self.process_byte(byte, now));
        }
        actions
    }

    fn record(&mut self, error: ControlError) {
        self.faults += 1;
        self.last_fault = Some(error);
    }

    fn transition(&mut self, next: ControlState) {
        if self.state != next {
            tracing::debug!(from = self.state.name(), to = next.name(), "control transition");
        }
        self.state = next;
    }
}

fn reply(result: Opcode) -> Vec<ControlAction> {
    vec![
        ControlAction::Send(Message::Signal(Opcode::Ready)),
        ControlAction::Send(Message::Signal(result)),
    ]
}

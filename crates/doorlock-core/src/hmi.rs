//! HMI node: keypad, display and the user-facing flows.
//!
//! Like [`crate::control`], the node is I/O-free. Key presses, received bytes
//! and ticks go in; [`HmiAction`]s come out. `Pause` actions carry the
//! debounce and notice delays the driver must honor in order.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐ NO_PREVIOUS  ┌─────────────┐ confirmed ┌─────────────────┐ SAVED  ┌──────┐
//! │ Booting │─────────────>│ SetPassword │──────────>│ AwaitingSaveAck │───────>│ Menu │
//! └─────────┘              └─────────────┘           └─────────────────┘        └──────┘
//!      │ PREV_DETECTED                                                       + / - │
//!      └──────────────────────────────────> Menu                                  ↓
//!                    ┌───────┐ WRONG_3_TIMES ┌─────────────────┐ 5 digits ┌───────────────┐
//!                    │ Alarm │<──────────────│ AwaitingVerdict │<─────────│ EnterPassword │
//!                    └───────┘               └─────────────────┘          └───────────────┘
//! ```
//!
//! A correct door-flow verdict runs `DoorOpening` then `DoorClosing`; a correct
//! change-flow verdict returns to `SetPassword`. After an alarm the node
//! prompts for the interrupted flow's password until a check succeeds.

use std::collections::VecDeque;

use doorlock_proto::{CREDENTIAL_LEN, Message, Opcode};

use crate::{
    Flow,
    config::{HmiConfig, TimingConfig},
    error::HmiError,
    keypad::{CaptureStep, Key, PasswordCapture, PasswordEntry},
    screen::Screen,
    time::{Tick, Window},
    verify::{LockoutGuard, MAX_ATTEMPTS, Verdict},
};

const FULL_MATCH: u8 = CREDENTIAL_LEN as u8;

/// Effects requested by the HMI node, executed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HmiAction {
    /// Transmit this message to Control
    Send(Message),
    /// Show this screen
    Render(Screen),
    /// Block for this long before the next action
    Pause(std::time::Duration),
}

/// HMI node state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmiState {
    /// READY sent; waiting for the storage status
    Booting {
        /// When READY was last sent
        since: Tick,
    },
    /// Capturing a new password twice
    SetPassword {
        /// Control has no credential yet
        first_boot: bool,
    },
    /// NEW_PASSWORD_TO_SAVE sent
    AwaitingSaveAck {
        /// Control has no credential yet
        first_boot: bool,
        /// When the password was sent
        since: Tick,
        /// The READY prefix has arrived
        acked: bool,
    },
    /// Main menu
    Menu,
    /// Prompting for the password of a flow
    EnterPassword(Flow),
    /// CHECK_PASSWORD sent
    AwaitingVerdict {
        /// Flow being authorized
        flow: Flow,
        /// When the password was sent
        since: Tick,
        /// The READY prefix has arrived
        acked: bool,
    },
    /// Lockout alarm countdown
    Alarm(Flow),
    /// Door open countdown
    DoorOpening,
    /// Door close countdown
    DoorClosing,
}

impl HmiState {
    /// Short name for logs and error values.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Booting { .. } => "booting",
            Self::SetPassword { .. } => "set password",
            Self::AwaitingSaveAck { .. } => "awaiting save ack",
            Self::Menu => "menu",
            Self::EnterPassword(_) => "enter password",
            Self::AwaitingVerdict { .. } => "awaiting verdict",
            Self::Alarm(_) => "alarm",
            Self::DoorOpening => "door opening",
            Self::DoorClosing => "door closing",
        }
    }
}

/// The HMI node.
#[derive(Debug)]
pub struct HmiNode {
    state: HmiState,
    guard: LockoutGuard,
    recovery: Option<Flow>,
    entry: PasswordEntry,
    capture: PasswordCapture,
    window: Option<Window>,
    deferred: VecDeque<u8>,
    timing: TimingConfig,
    config: HmiConfig,
    last_fault: Option<HmiError>,
    faults: usize,
}

impl HmiNode {
    /// Create a node. Call [`HmiNode::start`] before feeding it events.
    pub fn new(timing: TimingConfig, config: HmiConfig) -> Self {
        Self {
            state: HmiState::Booting { since: Tick::default() },
            guard: LockoutGuard::new(),
            recovery: None,
            entry: PasswordEntry::new(),
            capture: PasswordCapture::new(),
            window: None,
            deferred: VecDeque::new(),
            timing,
            config,
            last_fault: None,
            faults: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> HmiState {
        self.state
    }

    /// Whether the local lockout flag is raised.
    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }

    /// Consecutive failed checks seen locally.
    pub fn failures(&self) -> u8 {
        self.guard.failures()
    }

    /// Most recent fault, if any.
    pub fn last_fault(&self) -> Option<&HmiError> {
        self.last_fault.as_ref()
    }

    /// Faults recorded since start.
    pub fn fault_count(&self) -> usize {
        self.faults
    }

    /// Power on: greet and ask Control for its storage status.
    pub fn start(&mut self, now: Tick) -> Vec<HmiAction> {
        self.state = HmiState::Booting { since: now };
        vec![HmiAction::Render(Screen::Welcome), HmiAction::Send(Message::Signal(Opcode::Ready))]
    }

    /// Process one key press.
    pub fn handle_key(&mut self, key: Key, now: Tick) -> Vec<HmiAction> {
        match (self.state, key) {
            (HmiState::SetPassword { first_boot }, Key::Digit(digit)) => {
                self.capture_digit(digit, first_boot, now)
            },
            (HmiState::Menu, Key::Plus) => self.select(Flow::ChangePassword),
            (HmiState::Menu, Key::Minus) => self.select(Flow::Door),
            (HmiState::EnterPassword(flow), Key::Digit(digit)) => self.enter_digit(flow, digit, now),
            (state, key) => {
                tracing::trace!(?key, state = state.name(), "key ignored");
                Vec::new()
            },
        }
    }

    /// Process one byte from the UART.
    pub fn handle_byte(&mut self, byte: u8, now: Tick) -> Vec<HmiAction> {
        if self.is_busy() {
            tracing::trace!(byte, state = self.state.name(), "deferred");
            self.deferred.push_back(byte);
            return Vec::new();
        }
        self.process_byte(byte, now)
    }

    /// Advance to `now`: run countdowns, enforce reply timeouts.
    pub fn tick(&mut self, now: Tick) -> Vec<HmiAction> {
        match self.state {
            HmiState::Booting { since } => {
                let elapsed = now.since(since);
                if elapsed < self.timing.reply_timeout {
                    return Vec::new();
                }
                tracing::debug!(elapsed, "no storage status yet, repeating READY");
                self.record(HmiError::Timeout { elapsed, state: self.state.name() });
                self.state = HmiState::Booting { since: now };
                vec![HmiAction::Send(Message::Signal(Opcode::Ready))]
            },
            HmiState::AwaitingSaveAck { since, .. } | HmiState::AwaitingVerdict { since, .. } => {
                let elapsed = now.since(since);
                if elapsed < self.timing.reply_timeout {
                    return Vec::new();
                }
                tracing::warn!(elapsed, state = self.state.name(), "no reply from control");
                self.record(HmiError::Timeout { elapsed, state: self.state.name() });
                let mut actions = self.link_error();
                actions.extend(self.fall_back(now));
                actions
            },
            HmiState::Alarm(_) => self.countdown(now, |remaining| Screen::Alarm { remaining }),
            HmiState::DoorOpening => self.countdown(now, |remaining| Screen::DoorOpening { remaining }),
            HmiState::DoorClosing => self.countdown(now, |remaining| Screen::DoorClosing { remaining }),
            _ => Vec::new(),
        }
    }

    fn is_busy(&self) -> bool {
        matches!(self.state, HmiState::Alarm(_) | HmiState::DoorOpening | HmiState::DoorClosing)
    }

    fn process_byte(&mut self, byte: u8, now: Tick) -> Vec<HmiAction> {
        use HmiState as S;

        let opcode = match Opcode::try_from(byte) {
            Ok(opcode) => opcode,
            Err(err) => return self.reject(err.into(), now),
        };

        match (self.state, opcode) {
            (S::Booting { .. }, Opcode::NoPreviousPassword) => {
                tracing::info!("control has no credential, starting first-boot setup");
                self.begin_set_password(true)
            },
            (S::Booting { .. }, Opcode::PreviousPasswordDetected) => {
                tracing::info!("control has a stored credential");
                let mut actions = vec![
                    HmiAction::Render(Screen::PreviousPassword),
                    HmiAction::Pause(self.config.notice_hold),
                ];
                actions.extend(self.enter_idle());
                actions
            },
            (S::Booting { .. }, Opcode::Error) => {
                // Control could not read storage; the boot retry asks again
                self.record(HmiError::PeerRejected);
                Vec::new()
            },
            (S::AwaitingSaveAck { first_boot, since, acked: false }, Opcode::Ready) => {
                self.state = S::AwaitingSaveAck { first_boot, since, acked: true };
                Vec::new()
            },
            (S::AwaitingSaveAck { first_boot, acked: true, .. }, Opcode::PasswordSaved) => {
                self.saved(first_boot)
            },
            (S::AwaitingSaveAck { first_boot, acked: true, .. }, Opcode::PasswordNotSaved) => {
                self.not_saved(first_boot)
            },
            (S::AwaitingVerdict { flow, since, acked: false }, Opcode::Ready) => {
                self.state = S::AwaitingVerdict { flow, since, acked: true };
                Vec::new()
            },
            (S::AwaitingVerdict { flow, acked: true, .. }, Opcode::CorrectPassword) => {
                self.accepted(flow, now)
            },
            (S::AwaitingVerdict { flow, acked: true, .. }, Opcode::IncorrectPassword) => {
                self.rejected(flow)
            },
            (S::AwaitingVerdict { flow, acked: true, .. }, Opcode::Wrong3Times) => {
                self.locked_out(flow, now)
            },
            (state, Opcode::Error) => {
                tracing::warn!(state = state.name(), "control rejected exchange");
                self.record(HmiError::PeerRejected);
                let mut actions = self.link_error();
                actions.extend(self.fall_back(now));
                actions
            },
            (state, Opcode::Ready) => {
                tracing::trace!(state = state.name(), "stray READY ignored");
                Vec::new()
            },
            (state, opcode) => self.reject(HmiError::Unexpected { opcode, state: state.name() }, now),
        }
    }

    fn capture_digit(&mut self, digit: u8, first_boot: bool, now: Tick) -> Vec<HmiAction> {
        let debounce = HmiAction::Pause(self.config.debounce);
        match self.capture.push(digit) {
            CaptureStep::Typing { typed, confirming: false } => {
                vec![HmiAction::Render(Screen::NewPassword { typed }), debounce]
            },
            CaptureStep::Typing { typed, confirming: true } => {
                vec![HmiAction::Render(Screen::ConfirmPassword { typed }), debounce]
            },
            CaptureStep::FirstComplete => vec![
                HmiAction::Render(Screen::NewPassword { typed: CREDENTIAL_LEN }),
                debounce,
                HmiAction::Render(Screen::ConfirmPassword { typed: 0 }),
            ],
            step @ CaptureStep::Done { credential, match_count } => {
                let mut actions =
                    vec![HmiAction::Render(Screen::ConfirmPassword { typed: CREDENTIAL_LEN }), debounce];
                if step.is_confirmed() {
                    self.state = HmiState::AwaitingSaveAck { first_boot, since: now, acked: false };
                    actions.push(HmiAction::Send(Message::NewPassword(credential)));
                    actions.push(HmiAction::Render(Screen::Correct));
                    actions.push(HmiAction::Pause(self.config.notice_hold));
                } else {
                    tracing::debug!(match_count, "confirmation differs from first entry");
                    actions.push(HmiAction::Render(Screen::PasswordsDiffer));
                    actions.push(HmiAction::Pause(self.config.result_hold));
                    actions.extend(self.begin_set_password(first_boot));
                }
                actions
            },
        }
    }

    fn select(&mut self, flow: Flow) -> Vec<HmiAction> {
        let (command, notice) = match flow {
            Flow::ChangePassword => (Opcode::OverwritePassword, Screen::ChangePassword),
            Flow::Door => (Opcode::DoorManipulation, Screen::OpenDoor),
        };
        tracing::debug!(?flow, "flow selected");
        self.entry.clear();
        self.state = HmiState::EnterPassword(flow);
        vec![
            HmiAction::Pause(self.config.debounce),
            HmiAction::Send(Message::Signal(Opcode::Ready)),
            HmiAction::Send(Message::Signal(command)),
            HmiAction::Render(notice),
            HmiAction::Pause(self.config.notice_hold),
            HmiAction::Render(Screen::EnterPassword { typed: 0, locked: false }),
        ]
    }

    fn enter_digit(&mut self, flow: Flow, digit: u8, now: Tick) -> Vec<HmiAction> {
        let locked = self.guard.is_locked();
        let debounce = HmiAction::Pause(self.config.debounce);
        match self.entry.push(digit) {
            None => vec![HmiAction::Render(Screen::EnterPassword { typed: self.entry.len(), locked }), debounce],
            Some(candidate) => {
                self.state = HmiState::AwaitingVerdict { flow, since: now, acked: false };
                vec![
                    HmiAction::Render(Screen::EnterPassword { typed: CREDENTIAL_LEN, locked }),
                    debounce,
                    HmiAction::Send(Message::CheckPassword(candidate)),
                ]
            },
        }
    }

    fn saved(&mut self, first_boot: bool) -> Vec<HmiAction> {
        tracing::info!(first_boot, "password saved");
        let mut actions =
            vec![HmiAction::Render(Screen::PasswordSaved), HmiAction::Pause(self.config.result_hold)];
        actions.extend(self.enter_idle());
        actions
    }

    fn not_saved(&mut self, first_boot: bool) -> Vec<HmiAction> {
        tracing::warn!(first_boot, "control could not save password");
        let mut actions =
            vec![HmiAction::Render(Screen::PasswordNotSaved), HmiAction::Pause(self.config.result_hold)];
        if first_boot {
            // Control keeps waiting for a first password
            actions.extend(self.begin_set_password(true));
        } else {
            actions.extend(self.enter_idle());
        }
        actions
    }

    fn accepted(&mut self, flow: Flow, now: Tick) -> Vec<HmiAction> {
        tracing::info!(?flow, "password accepted");
        self.guard.evaluate(FULL_MATCH);
        self.recovery = None;

        let mut actions = vec![HmiAction::Render(Screen::Correct), HmiAction::Pause(self.config.notice_hold)];
        match flow {
            Flow::ChangePassword => actions.extend(self.begin_set_password(false)),
            Flow::Door => {
                let window = self.timing.door_open_window;
                self.window = Some(Window::start(now, window));
                self.state = HmiState::DoorOpening;
                actions.push(HmiAction::Send(Message::Signal(Opcode::DoorOpen)));
                actions.push(HmiAction::Render(Screen::DoorOpening { remaining: window }));
            },
        }
        actions
    }

    fn rejected(&mut self, flow: Flow) -> Vec<HmiAction> {
        let before = self.guard;
        let remaining = match self.guard.evaluate(0) {
            Verdict::RetryAllowed { remaining } => remaining,
            _ => {
                // Control is authoritative: it still allows a retry
                self.record(HmiError::CounterMismatch {
                    local: before.failures(),
                    reply: Opcode::IncorrectPassword,
                });
                self.guard = before;
                self.guard.reset_attempts();
                self.guard.evaluate(0);
                MAX_ATTEMPTS - 1
            },
        };
        tracing::debug!(?flow, remaining, "password rejected");

        self.entry.clear();
        self.state = HmiState::EnterPassword(flow);
        vec![
            HmiAction::Render(Screen::WrongPassword { remaining }),
            HmiAction::Pause(self.config.result_hold),
            HmiAction::Render(Screen::EnterPassword { typed: 0, locked: self.guard.is_locked() }),
        ]
    }

    fn locked_out(&mut self, flow: Flow, now: Tick) -> Vec<HmiAction> {
        let before = self.guard.failures();
        if self.guard.evaluate(0) != Verdict::LockedOut {
            self.record(HmiError::CounterMismatch { local: before, reply: Opcode::Wrong3Times });
            self.guard.force_lockout();
        }
        tracing::warn!(?flow, "locked out after three wrong passwords");

        let window = self.timing.alarm_window;
        self.recovery = Some(flow);
        self.window = Some(Window::start(now, window));
        self.state = HmiState::Alarm(flow);
        vec![HmiAction::Render(Screen::Alarm { remaining: window })]
    }

    fn countdown(&mut self, now: Tick, screen: impl Fn(u32) -> Screen) -> Vec<HmiAction> {
        let Some(window) = self.window else {
            return self.enter_idle();
        };
        if window.is_active(now) {
            return vec![HmiAction::Render(screen(window.remaining(now)))];
        }

        self.window = None;
        let mut actions = Vec::new();
        if self.state == HmiState::DoorOpening {
            let close = self.timing.door_close_window;
            self.window = Some(Window::start(now, close));
            self.state = HmiState::DoorClosing;
            actions.push(HmiAction::Send(Message::Signal(Opcode::DoorClose)));
            actions.push(HmiAction::Render(Screen::DoorClosing { remaining: close }));
            return actions;
        }

        actions.extend(self.enter_idle());
        actions.extend(self.drain_deferred(now));
        actions
    }

    fn begin_set_password(&mut self, first_boot: bool) -> Vec<HmiAction> {
        self.capture.clear();
        self.state = HmiState::SetPassword { first_boot };
        vec![HmiAction::Render(Screen::NewPassword { typed: 0 })]
    }

    /// Menu, or the recovery prompt while a lockout is unresolved.
    fn enter_idle(&mut self) -> Vec<HmiAction> {
        self.entry.clear();
        self.capture.clear();
        match self.recovery {
            Some(flow) => {
                self.state = HmiState::EnterPassword(flow);
                vec![HmiAction::Render(Screen::EnterPassword { typed: 0, locked: true })]
            },
            None => {
                self.state = HmiState::Menu;
                vec![HmiAction::Render(Screen::Menu)]
            },
        }
    }

    /// Abandon the current exchange.
    fn fall_back(&mut self, now: Tick) -> Vec<HmiAction> {
        match self.state {
            HmiState::Booting { .. } => Vec::new(),
            HmiState::SetPassword { first_boot: true }
            | HmiState::AwaitingSaveAck { first_boot: true, .. } => {
                // Ask Control where it stands before capturing again
                self.state = HmiState::Booting { since: now };
                vec![HmiAction::Render(Screen::Welcome), HmiAction::Send(Message::Signal(Opcode::Ready))]
            },
            _ => self.enter_idle(),
        }
    }

    fn link_error(&self) -> Vec<HmiAction> {
        vec![HmiAction::Render(Screen::LinkError), HmiAction::Pause(self.config.result_hold)]
    }

    /// Desync: answer ERROR, flush, fall back.
    fn reject(&mut self, error: HmiError, now: Tick) -> Vec<HmiAction> {
        tracing::warn!(%error, state = self.state.name(), "rejecting reply");
        self.record(error);
        let mut actions = vec![HmiAction::Send(Message::Signal(Opcode::Error))];
        actions.extend(self.link_error());
        actions.extend(self.fall_back(now));
        actions
    }

    fn drain_deferred(&mut self, now: Tick) -> Vec<HmiAction> {
        let mut actions = Vec::new();
        while !self.is_busy() {
            let Some(byte) = self.deferred.pop_front() else { break };
            actions.extend(self.process_byte(byte, now));
        }
        actions
    }

    fn record(&mut self, error: HmiError) {
        self.faults += 1;
        self.last_fault = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use doorlock_proto::Credential;

    use super::*;

    fn node() -> HmiNode {
        let mut hmi = HmiNode::new(TimingConfig::default(), HmiConfig::default());
        hmi.start(Tick(0));
        hmi
    }

    fn menu() -> HmiNode {
        let mut hmi = node();
        hmi.handle_byte(0x23, Tick(0));
        hmi
    }

    fn sent(actions: &[HmiAction]) -> Vec<u8> {
        actions
            .iter()
            .filter_map(|a| match a {
                HmiAction::Send(m) => Some(m.to_bytes().to_vec()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn type_digits(hmi: &mut HmiNode, digits: &[u8], now: Tick) -> Vec<HmiAction> {
        digits.iter().flat_map(|d| hmi.handle_key(Key::Digit(*d), now)).collect()
    }

    #[test]
    fn boot_sends_ready() {
        let mut hmi = HmiNode::new(TimingConfig::default(), HmiConfig::default());
        let actions = hmi.start(Tick(0));
        assert_eq!(sent(&actions), vec![0x10]);
        assert_eq!(hmi.state(), HmiState::Booting { since: Tick(0) });
    }

    #[test]
    fn boot_retries_ready_until_answered() {
        let mut hmi = node();
        assert!(hmi.tick(Tick(2)).is_empty());
        assert_eq!(sent(&hmi.tick(Tick(3))), vec![0x10]);
        assert!(hmi.tick(Tick(5)).is_empty());
        assert_eq!(sent(&hmi.tick(Tick(6))), vec![0x10]);
    }

    #[test]
    fn first_boot_capture_and_save() {
        let mut hmi = node();
        hmi.handle_byte(0x20, Tick(0));
        assert_eq!(hmi.state(), HmiState::SetPassword { first_boot: true });

        let actions = type_digits(&mut hmi, &[1, 2, 3, 4, 5, 1, 2, 3, 4, 5], Tick(1));
        assert_eq!(sent(&actions), vec![0x21, 1, 2, 3, 4, 5]);

        hmi.handle_byte(0x10, Tick(2));
        let actions = hmi.handle_byte(0x22, Tick(2));
        assert!(actions.contains(&HmiAction::Render(Screen::PasswordSaved)));
        assert_eq!(hmi.state(), HmiState::Menu);
    }

    #[test]
    fn mismatched_confirmation_restarts_capture() {
        let mut hmi = node();
        hmi.handle_byte(0x20, Tick(0));
        let actions = type_digits(&mut hmi, &[1, 2, 3, 4, 5, 1, 2, 3, 4, 6], Tick(1));
        assert!(sent(&actions).is_empty());
        assert!(actions.contains(&HmiAction::Render(Screen::PasswordsDiffer)));
        assert_eq!(hmi.state(), HmiState::SetPassword { first_boot: true });
    }

    #[test]
    fn menu_keys_start_flows() {
        let mut hmi = menu();
        assert!(hmi.handle_key(Key::Other(b'='), Tick(1)).is_empty());

        let actions = hmi.handle_key(Key::Minus, Tick(1));
        assert_eq!(sent(&actions), vec![0x10, 0x40]);
        assert_eq!(hmi.state(), HmiState::EnterPassword(Flow::Door));

        let actions = type_digits(&mut hmi, &[1, 2, 3, 4, 5], Tick(2));
        assert_eq!(sent(&actions), vec![0x41, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn correct_door_password_runs_countdowns() {
        let mut hmi = menu();
        hmi.handle_key(Key::Minus, Tick(1));
        type_digits(&mut hmi, &[1, 2, 3, 4, 5], Tick(1));
        hmi.handle_byte(0x10, Tick(2));
        let actions = hmi.handle_byte(0x42, Tick(2));
        assert_eq!(sent(&actions), vec![0x45]);
        assert_eq!(hmi.state(), HmiState::DoorOpening);

        assert_eq!(hmi.tick(Tick(5)), vec![HmiAction::Render(Screen::DoorOpening { remaining: 7 })]);
        assert_eq!(sent(&hmi.tick(Tick(12))), vec![0x46]);
        assert_eq!(hmi.state(), HmiState::DoorClosing);

        hmi.tick(Tick(22));
        assert_eq!(hmi.state(), HmiState::Menu);
    }

    #[test]
    fn wrong_passwords_count_down_to_alarm() {
        let mut hmi = menu();
        hmi.handle_key(Key::Plus, Tick(1));

        for remaining in [2, 1] {
            type_digits(&mut hmi, &[0, 0, 0, 0, 0], Tick(1));
            hmi.handle_byte(0x10, Tick(1));
            let actions = hmi.handle_byte(0x43, Tick(1));
            assert_eq!(actions[0], HmiAction::Render(Screen::WrongPassword { remaining }));
        }

        type_digits(&mut hmi, &[0, 0, 0, 0, 0], Tick(1));
        hmi.handle_byte(0x10, Tick(1));
        hmi.handle_byte(0x44, Tick(1));
        assert_eq!(hmi.state(), HmiState::Alarm(Flow::ChangePassword));
        assert!(hmi.is_locked());
        assert_eq!(hmi.last_fault(), None);

        // keys do nothing during the alarm
        assert!(hmi.handle_key(Key::Plus, Tick(30)).is_empty());

        let actions = hmi.tick(Tick(61));
        assert_eq!(actions, vec![HmiAction::Render(Screen::EnterPassword { typed: 0, locked: true })]);
        assert_eq!(hmi.state(), HmiState::EnterPassword(Flow::ChangePassword));

        // recovery check goes straight out without a new command
        let actions = type_digits(&mut hmi, &[9, 9, 9, 9, 9], Tick(62));
        assert_eq!(sent(&actions), vec![0x41, 9, 9, 9, 9, 9]);
        hmi.handle_byte(0x10, Tick(62));
        hmi.handle_byte(0x42, Tick(62));
        assert!(!hmi.is_locked());
        assert_eq!(hmi.state(), HmiState::SetPassword { first_boot: false });
    }

    #[test]
    fn verdict_timeout_falls_back_to_menu() {
        let mut hmi = menu();
        hmi.handle_key(Key::Minus, Tick(1));
        type_digits(&mut hmi, &[1, 2, 3, 4, 5], Tick(1));

        assert!(hmi.tick(Tick(3)).is_empty());
        let actions = hmi.tick(Tick(4));
        assert!(actions.contains(&HmiAction::Render(Screen::LinkError)));
        assert_eq!(hmi.state(), HmiState::Menu);
        assert!(matches!(hmi.last_fault(), Some(HmiError::Timeout { .. })));
    }

    #[test]
    fn verdict_without_ready_prefix_is_rejected() {
        let mut hmi = menu();
        hmi.handle_key(Key::Minus, Tick(1));
        type_digits(&mut hmi, &[1, 2, 3, 4, 5], Tick(1));

        let actions = hmi.handle_byte(0x42, Tick(2));
        assert_eq!(sent(&actions), vec![0x00]);
        assert_eq!(hmi.state(), HmiState::Menu);
    }

    #[test]
    fn undecodable_byte_is_rejected() {
        let mut hmi = menu();
        let actions = hmi.handle_byte(0x99, Tick(1));
        assert_eq!(sent(&actions), vec![0x00]);
        assert!(matches!(hmi.last_fault(), Some(HmiError::Protocol(_))));
    }

    #[test]
    fn diverged_lockout_follows_control() {
        let mut hmi = menu();
        hmi.handle_key(Key::Minus, Tick(1));
        type_digits(&mut hmi, &[0, 0, 0, 0, 0], Tick(1));
        hmi.handle_byte(0x10, Tick(1));
        hmi.handle_byte(0x44, Tick(1));

        assert!(hmi.is_locked());
        assert_eq!(
            hmi.last_fault(),
            Some(&HmiError::CounterMismatch { local: 0, reply: Opcode::Wrong3Times })
        );
    }

    #[test]
    fn save_sends_first_entry() {
        let mut hmi = node();
        hmi.handle_byte(0x20, Tick(0));
        let actions = type_digits(&mut hmi, &[4, 4, 4, 4, 4, 4, 4, 4, 4, 4], Tick(1));
        assert!(actions.contains(&HmiAction::Send(Message::NewPassword(Credential::new([4; 5])))));
    }
}

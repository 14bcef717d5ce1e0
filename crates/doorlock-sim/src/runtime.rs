//! Task wiring: one tick source, two node tasks, two byte channels.
//!
//! ```text
//!              ┌──────────── watch<Tick> ────────────┐
//!              ▼                                     ▼
//!   keys ──> HMI task ──── mpsc<u8> (to Control) ──> Control task ──> motor, buzzer
//!              ▲                                     │
//!              └──────────── mpsc<u8> (to HMI) ──────┘
//! ```
//!
//! The tick task is the only writer of a shared [`TickCounter`]; both node
//! tasks timestamp bytes and keys with a snapshot of it and use the watch
//! channel only to learn that a tick passed.
//!
//! The HMI task owns the key script. Once the script is spent and both nodes
//! have been at rest for a few ticks it returns, dropping its sender; the
//! Control task sees its channel close and reports.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use doorlock_core::{
    ControlAction, ControlState, Direction, HmiAction, HmiConfig, HmiNode, HmiState, Key, Tick,
    TickCounter,
    screen::{COLUMNS, Screen},
};
use doorlock_proto::{Credential, Message};
use tokio::{
    sync::{mpsc, watch},
    time,
};

use crate::{
    args::Args,
    board::{self, SimControl, SimOutputs},
    error::SimError,
};

/// Ticks both nodes must stay at rest before the run ends.
const SETTLE_TICKS: u32 = 2;

/// Final state of a completed run.
#[derive(Debug, Clone)]
pub struct Report {
    /// Ticks elapsed
    pub ticks: u32,
    /// Where the HMI ended
    pub hmi_state: HmiState,
    /// Faults the HMI recovered from
    pub hmi_faults: usize,
    /// Where Control ended
    pub control_state: ControlState,
    /// Faults Control recovered from
    pub control_faults: usize,
    /// Credential left in the EEPROM, if any was ever written
    pub stored: Option<Credential>,
    /// Door openings driven
    pub door_cycles: usize,
    /// Alarms sounded
    pub alarms: usize,
}

/// Run both nodes until the key script is spent and the system is at rest.
pub async fn run(args: &Args) -> Result<Report, SimError> {
    let timing = args.timing();
    let (control, outputs) = board::control_board(args.boot_credential(), timing)?;

    let (to_control, control_rx) = mpsc::unbounded_channel();
    let (to_hmi, hmi_rx) = mpsc::unbounded_channel();
    let clock = Arc::new(TickCounter::new());
    let (tick_tx, tick_rx) = watch::channel(clock.now());
    let (idle_tx, idle_rx) = watch::channel(true);

    let tick = Duration::from_millis(args.tick_ms);
    let ticker = tokio::spawn(drive_ticks(Arc::clone(&clock), tick_tx, tick, args.max_ticks));

    let control_task = ControlTask {
        node: control,
        outputs,
        uart_rx: control_rx,
        uart_tx: to_hmi,
        clock: Arc::clone(&clock),
        ticks: tick_rx.clone(),
        idle: idle_tx,
        door_cycles: 0,
        alarms: 0,
    };
    let control_handle = tokio::spawn(control_task.run());

    let hmi_task = HmiTask {
        node: HmiNode::new(timing, HmiConfig::default()),
        script: args.keys.chars().filter_map(Key::from_char).collect(),
        uart_rx: hmi_rx,
        uart_tx: to_control,
        clock,
        ticks: tick_rx,
        control_idle: idle_rx,
        key_delay: Duration::from_millis(args.key_ms),
        tick,
    };
    let hmi = hmi_task.run().await;

    ticker.abort();
    let control = control_handle.await??;
    let hmi = hmi?;

    Ok(Report {
        ticks: hmi.ticks,
        hmi_state: hmi.state,
        hmi_faults: hmi.faults,
        control_state: control.state,
        control_faults: control.faults,
        stored: control.stored,
        door_cycles: control.door_cycles,
        alarms: control.alarms,
    })
}

/// Timer context: advance the counter once per period and announce it.
async fn drive_ticks(
    clock: Arc<TickCounter>,
    ticks: watch::Sender<Tick>,
    period: Duration,
    max_ticks: u32,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    // first tick completes immediately
    interval.tick().await;
    for _ in 0..max_ticks {
        interval.tick().await;
        ticks.send_replace(clock.advance());
    }
}

struct ControlReport {
    state: ControlState,
    faults: usize,
    stored: Option<Credential>,
    door_cycles: usize,
    alarms: usize,
}

struct ControlTask {
    node: SimControl,
    outputs: SimOutputs,
    uart_rx: mpsc::UnboundedReceiver<u8>,
    uart_tx: mpsc::UnboundedSender<u8>,
    clock: Arc<TickCounter>,
    ticks: watch::Receiver<Tick>,
    idle: watch::Sender<bool>,
    door_cycles: usize,
    alarms: usize,
}

impl ControlTask {
    async fn run(mut self) -> Result<ControlReport, SimError> {
        loop {
            tokio::select! {
                byte = self.uart_rx.recv() => {
                    let Some(byte) = byte else { break };
                    let actions = self.node.handle_byte(byte, self.clock.now());
                    self.execute(actions)?;
                },
                changed = self.ticks.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let actions = self.node.tick(self.clock.now());
                    self.execute(actions)?;
                },
            }
            self.idle.send_replace(!self.is_busy());
        }

        let stored = match self.node.store_mut().read_credential() {
            Ok(credential) if credential.is_unset() => None,
            Ok(credential) => Some(credential),
            Err(err) => return Err(err.into()),
        };
        Ok(ControlReport {
            state: self.node.state(),
            faults: self.node.fault_count(),
            stored,
            door_cycles: self.door_cycles,
            alarms: self.alarms,
        })
    }

    fn execute(&mut self, actions: Vec<ControlAction>) -> Result<(), SimError> {
        for action in actions {
            match &action {
                ControlAction::Send(message) => {
                    send(&self.uart_tx, message);
                    continue;
                },
                ControlAction::Actuate(Direction::Open) => self.door_cycles += 1,
                ControlAction::Buzzer(true) => self.alarms += 1,
                ControlAction::Actuate(_) | ControlAction::Buzzer(false) => {},
            }
            self.outputs.apply(&action)?;
        }
        Ok(())
    }

    fn is_busy(&self) -> bool {
        matches!(
            self.node.state(),
            ControlState::DoorOpening
                | ControlState::AwaitingDoorClose { .. }
                | ControlState::DoorClosing
                | ControlState::Alarm(_)
        ) || self.node.actuator() != Direction::Stop
            || self.node.buzzer()
    }
}

struct HmiReport {
    ticks: u32,
    state: HmiState,
    faults: usize,
}

struct HmiTask {
    node: HmiNode,
    script: VecDeque<Key>,
    uart_rx: mpsc::UnboundedReceiver<u8>,
    uart_tx: mpsc::UnboundedSender<u8>,
    clock: Arc<TickCounter>,
    ticks: watch::Receiver<Tick>,
    control_idle: watch::Receiver<bool>,
    key_delay: Duration,
    tick: Duration,
}

impl HmiTask {
    async fn run(mut self) -> Result<HmiReport, SimError> {
        let mut keys = time::interval(self.key_delay);
        keys.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        let mut quiet = 0;

        let actions = self.node.start(self.clock.now());
        self.execute(actions).await;

        loop {
            tokio::select! {
                byte = self.uart_rx.recv() => {
                    let Some(byte) = byte else { return Err(SimError::LinkClosed("control")) };
                    let actions = self.node.handle_byte(byte, self.clock.now());
                    self.execute(actions).await;
                },
                changed = self.ticks.changed() => {
                    let now = self.clock.now();
                    if changed.is_err() {
                        tracing::warn!(ticks = now.0, "tick limit reached");
                        return Err(SimError::TickLimit { ticks: now.0, pending: self.script.len() });
                    }
                    let actions = self.node.tick(now);
                    self.execute(actions).await;

                    quiet = if self.at_rest() { quiet + 1 } else { 0 };
                    if quiet >= SETTLE_TICKS {
                        break;
                    }
                },
                _ = keys.tick(), if !self.script.is_empty() => {
                    if accepts_input(self.node.state()) {
                        if let Some(key) = self.script.pop_front() {
                            tracing::debug!(?key, "key pressed");
                            let actions = self.node.handle_key(key, self.clock.now());
                            self.execute(actions).await;
                        }
                    }
                },
            }
        }

        let ticks = self.clock.now().0;
        Ok(HmiReport { ticks, state: self.node.state(), faults: self.node.fault_count() })
    }

    async fn execute(&mut self, actions: Vec<HmiAction>) {
        for action in actions {
            match action {
                HmiAction::Send(message) => send(&self.uart_tx, &message),
                HmiAction::Render(screen) => render(&screen),
                HmiAction::Pause(duration) => time::sleep(self.scaled(duration)).await,
            }
        }
    }

    /// Pauses are wall-clock on the device; stretch them with the tick.
    fn scaled(&self, duration: Duration) -> Duration {
        let millis = u32::try_from(self.tick.as_millis()).unwrap_or(u32::MAX);
        duration * millis / 1000
    }

    fn at_rest(&self) -> bool {
        self.script.is_empty()
            && *self.control_idle.borrow()
            && !matches!(
                self.node.state(),
                HmiState::Booting { .. }
                    | HmiState::AwaitingSaveAck { .. }
                    | HmiState::AwaitingVerdict { .. }
                    | HmiState::Alarm(_)
                    | HmiState::DoorOpening
                    | HmiState::DoorClosing
            )
    }
}

/// States in which the user can usefully type.
fn accepts_input(state: HmiState) -> bool {
    matches!(state, HmiState::Menu | HmiState::EnterPassword(_) | HmiState::SetPassword { .. })
}

fn send(uart: &mpsc::UnboundedSender<u8>, message: &Message) {
    tracing::debug!(opcode = ?message.opcode(), "tx");
    for byte in message.to_bytes() {
        if uart.send(byte).is_err() {
            tracing::debug!("peer gone, dropping remaining bytes");
            return;
        }
    }
}

fn render(screen: &Screen) {
    let [top, bottom] = screen.lines();
    tracing::info!(target: "lcd", "|{top:<COLUMNS$}|{bottom:<COLUMNS$}|");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tick_source_advances_the_shared_counter() {
        let clock = Arc::new(TickCounter::new());
        let (tx, mut rx) = watch::channel(clock.now());

        let ticker =
            tokio::spawn(drive_ticks(Arc::clone(&clock), tx, Duration::from_millis(100), 3));
        rx.changed().await.unwrap();
        assert!(*rx.borrow() >= Tick(1));
        ticker.await.unwrap();

        assert_eq!(clock.now(), Tick(3));
        assert_eq!(*rx.borrow(), Tick(3));
    }
}

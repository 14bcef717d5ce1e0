//! Both nodes, two links and a virtual clock.
//!
//! The World executes node actions the way a real driver would (bytes onto the
//! link, outputs into the trace) and delivers in-flight bytes until both links
//! are quiet. Time only moves when [`World::advance`] is called.

use std::time::Duration;

use doorlock_core::{
    ControlAction, ControlNode, ControlState, CredentialStore, Direction, HmiAction, HmiConfig,
    HmiNode, HmiState, Key, MemoryStorage, NoDelay, Screen, StorageConfig, Tick, TimingConfig,
};
use doorlock_proto::{CREDENTIAL_LEN, Credential, Message, Opcode};

use crate::link::{Fault, LinkFaults, SimLink};

/// Control node as simulated: in-memory EEPROM, no settle delay.
pub type SimControl = ControlNode<MemoryStorage, NoDelay>;

/// Upper bound on bytes delivered by one [`World::settle`].
const SETTLE_LIMIT: usize = 10_000;

/// Which node an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    /// Keypad and display node
    Hmi,
    /// Storage and actuator node
    Control,
}

/// Something observable that happened during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A node transmitted a message
    Sent {
        /// Sender
        node: Node,
        /// When
        at: Tick,
        /// What
        message: Message,
    },
    /// The link damaged a byte
    Fault {
        /// Sender of the damaged byte
        from: Node,
        /// When
        at: Tick,
        /// How
        fault: Fault,
    },
    /// Control drove the door motor
    Actuate {
        /// When
        at: Tick,
        /// Drive applied
        direction: Direction,
    },
    /// Control switched the buzzer
    Buzzer {
        /// When
        at: Tick,
        /// New state
        on: bool,
    },
    /// HMI painted a screen
    Render {
        /// When
        at: Tick,
        /// What
        screen: Screen,
    },
}

/// Knobs for one simulated run.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldConfig {
    /// Timing shared by both nodes
    pub timing: TimingConfig,
    /// HMI presentation timing
    pub hmi: HmiConfig,
    /// Credential placement
    pub storage: StorageConfig,
    /// Fault profile applied to both links
    pub faults: LinkFaults,
    /// Seed for fault injection
    pub seed: u64,
}

/// World state containing both nodes and the event trace.
pub struct World {
    control: SimControl,
    hmi: HmiNode,
    to_control: SimLink,
    to_hmi: SimLink,
    now: Tick,
    events: Vec<Event>,
    paused: Duration,
    base_address: u16,
}

impl World {
    /// Create a world around the given EEPROM image. Nothing runs until
    /// [`World::boot`].
    pub fn new(storage: MemoryStorage, config: WorldConfig) -> Self {
        let store = CredentialStore::new(storage, NoDelay, config.storage);
        Self {
            control: ControlNode::new(store, config.timing),
            hmi: HmiNode::new(config.timing, config.hmi),
            to_control: SimLink::new(config.faults, config.seed),
            to_hmi: SimLink::new(config.faults, config.seed.wrapping_add(0x9E37_79B9_7F4A_7C15)),
            now: Tick::default(),
            events: Vec::new(),
            paused: Duration::ZERO,
            base_address: config.storage.base_address,
        }
    }

    /// Power on the HMI and run the boot exchange.
    pub fn boot(&mut self) {
        let actions = self.hmi.start(self.now);
        self.run_hmi(actions);
        self.settle();
    }

    /// Press one key, then deliver whatever it caused.
    pub fn press(&mut self, key: Key) {
        let actions = self.hmi.handle_key(key, self.now);
        self.run_hmi(actions);
        self.settle();
    }

    /// Press every recognised key in `keys`; other characters are skipped.
    pub fn type_keys(&mut self, keys: &str) {
        for key in keys.chars().filter_map(Key::from_char) {
            self.press(key);
        }
    }

    /// Put a raw byte on the link toward `to`, bypassing fault injection.
    pub fn inject(&mut self, to: Node, byte: u8) {
        match to {
            Node::Control => self.to_control.inject(byte),
            Node::Hmi => self.to_hmi.inject(byte),
        }
        self.settle();
    }

    /// Advance the clock one tick at a time, delivering traffic after each.
    pub fn advance(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.now = self.now.offset(1);
            let actions = self.control.tick(self.now);
            self.run_control(actions);
            let actions = self.hmi.tick(self.now);
            self.run_hmi(actions);
            self.settle();
        }
    }

    /// Deliver in-flight bytes, alternating directions, until both links are
    /// idle. Returns the number of bytes delivered.
    pub fn settle(&mut self) -> usize {
        let mut delivered = 0;
        while delivered < SETTLE_LIMIT {
            let mut progressed = false;
            if let Some(byte) = self.to_control.recv() {
                let actions = self.control.handle_byte(byte, self.now);
                self.run_control(actions);
                delivered += 1;
                progressed = true;
            }
            if let Some(byte) = self.to_hmi.recv() {
                let actions = self.hmi.handle_byte(byte, self.now);
                self.run_hmi(actions);
                delivered += 1;
                progressed = true;
            }
            if !progressed {
                return delivered;
            }
        }
        tracing::warn!(delivered, "links still busy after settle limit");
        delivered
    }

    fn run_control(&mut self, actions: Vec<ControlAction>) {
        for action in actions {
            match action {
                ControlAction::Send(message) => self.transmit(Node::Control, message),
                ControlAction::Actuate(direction) => {
                    self.events.push(Event::Actuate { at: self.now, direction });
                },
                ControlAction::Buzzer(on) => self.events.push(Event::Buzzer { at: self.now, on }),
            }
        }
    }

    fn run_hmi(&mut self, actions: Vec<HmiAction>) {
        for action in actions {
            match action {
                HmiAction::Send(message) => self.transmit(Node::Hmi, message),
                HmiAction::Render(screen) => self.events.push(Event::Render { at: self.now, screen }),
                HmiAction::Pause(duration) => self.paused += duration,
            }
        }
    }

    fn transmit(&mut self, from: Node, message: Message) {
        let link = match from {
            Node::Hmi => &mut self.to_control,
            Node::Control => &mut self.to_hmi,
        };
        for byte in message.to_bytes() {
            if let Some(fault) = link.send(byte) {
                self.events.push(Event::Fault { from, at: self.now, fault });
            }
        }
        self.events.push(Event::Sent { node: from, at: self.now, message });
    }

    /// Current virtual time.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// The Control node.
    pub fn control(&self) -> &SimControl {
        &self.control
    }

    /// The Control node, mutably (storage fault injection).
    pub fn control_mut(&mut self) -> &mut SimControl {
        &mut self.control
    }

    /// The HMI node.
    pub fn hmi(&self) -> &HmiNode {
        &self.hmi
    }

    /// Full event trace.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Total time the HMI asked to pause.
    pub fn paused(&self) -> Duration {
        self.paused
    }

    /// Most recently rendered screen.
    pub fn screen(&self) -> Option<Screen> {
        self.events.iter().rev().find_map(|e| match e {
            Event::Render { screen, .. } => Some(*screen),
            _ => None,
        })
    }

    /// Whether `screen` was ever rendered.
    pub fn rendered(&self, screen: Screen) -> bool {
        self.events.iter().any(|e| matches!(e, Event::Render { screen: s, .. } if *s == screen))
    }

    /// Opcodes sent by `node`, in order.
    pub fn sent(&self, node: Node) -> Vec<Opcode> {
        self.messages(node).map(Message::opcode).collect()
    }

    /// Messages sent by `node`, in order.
    pub fn messages(&self, node: Node) -> impl Iterator<Item = &Message> + '_ {
        self.events.iter().filter_map(move |e| match e {
            Event::Sent { node: n, message, .. } if *n == node => Some(message),
            _ => None,
        })
    }

    /// Motor drives with their ticks.
    pub fn actuations(&self) -> Vec<(Tick, Direction)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Actuate { at, direction } => Some((*at, *direction)),
                _ => None,
            })
            .collect()
    }

    /// Buzzer switches with their ticks.
    pub fn buzzer_log(&self) -> Vec<(Tick, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Buzzer { at, on } => Some((*at, *on)),
                _ => None,
            })
            .collect()
    }

    /// Completed door openings (open drives issued).
    pub fn door_cycles(&self) -> usize {
        self.actuations().iter().filter(|(_, d)| *d == Direction::Open).count()
    }

    /// Lockout alarms raised.
    pub fn alarms(&self) -> usize {
        self.buzzer_log().iter().filter(|(_, on)| *on).count()
    }

    /// Bytes damaged by either link.
    pub fn link_faults(&self) -> usize {
        self.to_control.damaged() + self.to_hmi.damaged()
    }

    /// Credential currently in the EEPROM image.
    pub fn stored_credential(&self) -> Option<Credential> {
        let storage = self.control.store().storage();
        let mut digits = [0u8; CREDENTIAL_LEN];
        for (slot, digit) in digits.iter_mut().enumerate() {
            *digit = storage.peek(self.base_address.wrapping_add(slot as u16))?;
        }
        Some(Credential::new(digits))
    }

    /// No exchange, window or output is in progress; both nodes only wait
    /// for the user.
    pub fn is_quiescent(&self) -> bool {
        let hmi_waiting = matches!(
            self.hmi.state(),
            HmiState::AwaitingVerdict { .. }
                | HmiState::AwaitingSaveAck { .. }
                | HmiState::Alarm(_)
                | HmiState::DoorOpening
                | HmiState::DoorClosing
        );
        let control_busy = matches!(
            self.control.state(),
            ControlState::DoorOpening
                | ControlState::AwaitingDoorClose { .. }
                | ControlState::DoorClosing
                | ControlState::Alarm(_)
        );
        !hmi_waiting
            && !control_busy
            && self.control.actuator() == Direction::Stop
            && !self.control.buzzer()
            && self.to_control.is_idle()
            && self.to_hmi.is_idle()
    }
}

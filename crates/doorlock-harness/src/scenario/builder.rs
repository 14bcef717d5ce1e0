//! Scenario builder API.

use doorlock_core::{MemoryStorage, StorageConfig, TimingConfig};

use crate::{
    link::LinkFaults,
    scenario::OracleFn,
    world::{Node, World, WorldConfig},
};

/// One scripted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Press these keys (see [`doorlock_core::Key::from_char`])
    Keys(String),
    /// Advance the clock
    Advance(u32),
    /// Put a raw byte on the wire toward a node
    Inject {
        /// Receiving node
        to: Node,
        /// Byte value
        byte: u8,
    },
    /// Fail the next EEPROM reads
    FailStorageReads(usize),
    /// Fail the next EEPROM writes
    FailStorageWrites(usize),
}

/// Scenario builder.
///
/// Must call `.oracle()` to get a [`RunnableScenario`] that can be executed.
pub struct Scenario {
    name: String,
    storage: MemoryStorage,
    config: WorldConfig,
    steps: Vec<Step>,
}

impl Scenario {
    /// New scenario with erased EEPROM (first boot) and a clean link.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: MemoryStorage::new(),
            config: WorldConfig::default(),
            steps: Vec::new(),
        }
    }

    /// Preload the credential.
    pub fn stored(mut self, digits: [u8; 5]) -> Self {
        self.storage = MemoryStorage::with_contents(self.config.storage.base_address, &digits);
        self
    }

    /// Override node timing.
    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.config.timing = timing;
        self
    }

    /// Override credential placement. Call before [`Scenario::stored`].
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Damage bytes on both links.
    pub fn faults(mut self, faults: LinkFaults) -> Self {
        self.config.faults = faults;
        self
    }

    /// Seed for fault injection.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Press keys.
    pub fn keys(mut self, keys: impl Into<String>) -> Self {
        self.steps.push(Step::Keys(keys.into()));
        self
    }

    /// Advance the clock.
    pub fn advance(mut self, ticks: u32) -> Self {
        self.steps.push(Step::Advance(ticks));
        self
    }

    /// Inject a raw byte.
    pub fn inject(mut self, to: Node, byte: u8) -> Self {
        self.steps.push(Step::Inject { to, byte });
        self
    }

    /// Fail the next `n` EEPROM reads.
    pub fn fail_storage_reads(mut self, n: usize) -> Self {
        self.steps.push(Step::FailStorageReads(n));
        self
    }

    /// Fail the next `n` EEPROM writes.
    pub fn fail_storage_writes(mut self, n: usize) -> Self {
        self.steps.push(Step::FailStorageWrites(n));
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Boot both nodes, play the script, then run the oracle.
    pub fn run(self) -> Result<(), String> {
        let Scenario { name, storage, config, steps } = self.scenario;
        let mut world = World::new(storage, config);
        world.boot();

        for step in steps {
            tracing::debug!(scenario = %name, ?step, "step");
            match step {
                Step::Keys(keys) => world.type_keys(&keys),
                Step::Advance(ticks) => world.advance(ticks),
                Step::Inject { to, byte } => world.inject(to, byte),
                Step::FailStorageReads(n) => {
                    world.control_mut().store_mut().storage_mut().fail_next_reads(n);
                },
                Step::FailStorageWrites(n) => {
                    world.control_mut().store_mut().storage_mut().fail_next_writes(n);
                },
            }
        }

        (self.oracle)(&world).map_err(|reason| format!("Scenario '{name}': {reason}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_requires_oracle() {
        // This should compile - oracle provided
        let _scenario = Scenario::new("test").keys("12345").oracle(Box::new(|_world| Ok(())));

        // This should NOT compile - no oracle
        // let scenario = Scenario::new("test");
        // scenario.run(); // ERROR: no method `run` on type `Scenario`
    }

    #[test]
    fn oracle_failure_names_scenario() {
        let result = Scenario::new("always fails").oracle(Box::new(|_| Err("nope".into()))).run();
        assert_eq!(result, Err("Scenario 'always fails': nope".to_owned()));
    }
}

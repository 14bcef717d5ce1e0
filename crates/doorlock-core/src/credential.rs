//! Persistent credential storage for the Control node.
//!
//! The credential occupies five consecutive bytes starting at
//! [`StorageConfig::base_address`]. Every transaction is followed by the
//! settle delay the EEPROM write cycle requires. Writes are never verified
//! here; the caller reads back with [`CredentialStore::compare_credential`]
//! when it needs confirmation.

use doorlock_proto::{CREDENTIAL_LEN, Credential};
use embedded_hal::delay::DelayNs;

use crate::{
    config::StorageConfig,
    storage::{ByteStorage, StorageError},
};

/// Delay that returns immediately. For simulation and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Credential accessor over a byte storage transport.
pub struct CredentialStore<S, D> {
    storage: S,
    delay: D,
    config: StorageConfig,
}

impl<S: ByteStorage, D: DelayNs> CredentialStore<S, D> {
    /// Wrap a storage transport.
    pub fn new(storage: S, delay: D, config: StorageConfig) -> Self {
        Self { storage, delay, config }
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Underlying storage, mutably.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Whether every credential slot still holds the erased sentinel.
    pub fn is_empty(&mut self) -> Result<bool, StorageError> {
        Ok(self.read_credential()?.is_unset())
    }

    /// Read the five stored digits in order.
    pub fn read_credential(&mut self) -> Result<Credential, StorageError> {
        let mut digits = [0u8; CREDENTIAL_LEN];
        for (slot, digit) in digits.iter_mut().enumerate() {
            let address = self.address(slot);
            *digit = self.storage.read_byte(address)?;
            self.settle();
        }
        Ok(Credential::new(digits))
    }

    /// Write the five digits in order.
    ///
    /// Stops at the first failing transaction; earlier slots keep the new
    /// digits.
    pub fn write_credential(&mut self, credential: &Credential) -> Result<(), StorageError> {
        for (slot, &digit) in credential.digits().iter().enumerate() {
            let address = self.address(slot);
            self.storage.write_byte(address, digit)?;
            self.settle();
        }
        tracing::debug!(base = self.config.base_address, "credential written");
        Ok(())
    }

    /// Number of positions where the stored credential equals `candidate`.
    pub fn compare_credential(&mut self, candidate: &Credential) -> Result<u8, StorageError> {
        Ok(self.read_credential()?.match_count(candidate))
    }

    fn address(&self, slot: usize) -> u16 {
        self.config.base_address.wrapping_add(slot as u16)
    }

    fn settle(&mut self) {
        self.delay.delay_ms(self.config.settle_delay_ms);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::storage::MemoryStorage;

    /// Records every requested delay.
    #[derive(Default)]
    struct RecordingDelay {
        total_ns: u64,
        calls: usize,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
            self.calls += 1;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.total_ns += u64::from(ms) * 1_000_000;
            self.calls += 1;
        }
    }

    fn store() -> CredentialStore<MemoryStorage, NoDelay> {
        CredentialStore::new(MemoryStorage::new(), NoDelay, StorageConfig::default())
    }

    #[test]
    fn fresh_storage_is_empty() {
        assert_eq!(store().is_empty(), Ok(true));
    }

    #[test]
    fn any_programmed_slot_makes_storage_non_empty() {
        for slot in 0..5u16 {
            let mut store = store();
            store.storage_mut().write_byte(0x0311 + slot, 0x00).unwrap();
            assert_eq!(store.is_empty(), Ok(false), "slot {slot}");
        }
    }

    #[test]
    fn digits_land_at_fixed_addresses() {
        let mut store = store();
        store.write_credential(&Credential::new([1, 2, 3, 4, 5])).unwrap();
        let stored: Vec<_> = (0x0311..=0x0315).map(|a| store.storage().peek(a)).collect();
        assert_eq!(stored, vec![Some(1), Some(2), Some(3), Some(4), Some(5)]);
        assert_eq!(store.storage().peek(0x0310), Some(0xFF));
        assert_eq!(store.storage().peek(0x0316), Some(0xFF));
    }

    #[test]
    fn every_transaction_settles() {
        let mut store =
            CredentialStore::new(MemoryStorage::new(), RecordingDelay::default(), StorageConfig::default());
        store.write_credential(&Credential::new([1, 2, 3, 4, 5])).unwrap();
        store.read_credential().unwrap();
        assert_eq!(store.delay.calls, 10);
        assert_eq!(store.delay.total_ns, 10 * 10_000_000);
    }

    #[test]
    fn read_failure_is_distinct_from_mismatch() {
        let mut store = store();
        store.write_credential(&Credential::new([1, 2, 3, 4, 5])).unwrap();
        store.storage_mut().fail_next_reads(1);
        assert_eq!(
            store.compare_credential(&Credential::new([1, 2, 3, 4, 5])),
            Err(StorageError::Nack { address: 0x0311 })
        );
        assert_eq!(store.compare_credential(&Credential::new([1, 2, 3, 4, 5])), Ok(5));
    }

    #[test]
    fn write_failure_stops_early() {
        let mut store = store();
        store.storage_mut().set_offline(true);
        assert_eq!(
            store.write_credential(&Credential::new([1, 2, 3, 4, 5])),
            Err(StorageError::Bus { address: 0x0311 })
        );
        store.storage_mut().set_offline(false);
        assert_eq!(store.is_empty(), Ok(true));
    }

    #[test]
    fn custom_base_address() {
        let config = StorageConfig { base_address: 0x0000, settle_delay_ms: 0 };
        let mut store = CredentialStore::new(MemoryStorage::new(), NoDelay, config);
        store.write_credential(&Credential::new([7, 7, 7, 7, 7])).unwrap();
        assert_eq!(store.storage().peek(0x0000), Some(7));
        assert_eq!(store.storage().peek(0x0311), Some(0xFF));
    }

    proptest! {
        #[test]
        fn write_then_read_is_identity(digits in any::<[u8; 5]>()) {
            let mut store = store();
            let credential = Credential::new(digits);
            store.write_credential(&credential).unwrap();
            prop_assert_eq!(store.read_credential().unwrap(), credential);
            prop_assert_eq!(store.compare_credential(&credential).unwrap(), 5);
        }

        #[test]
        fn empty_iff_all_slots_erased(digits in any::<[u8; 5]>()) {
            let mut store = store();
            store.write_credential(&Credential::new(digits)).unwrap();
            prop_assert_eq!(store.is_empty().unwrap(), digits.iter().all(|&d| d == 0xFF));
        }

        #[test]
        fn compare_counts_equal_positions(stored in any::<[u8; 5]>(), candidate in any::<[u8; 5]>()) {
            let mut store = store();
            store.write_credential(&Credential::new(stored)).unwrap();
            let expected = stored.iter().zip(candidate.iter()).filter(|(a, b)| a == b).count() as u8;
            prop_assert_eq!(store.compare_credential(&Credential::new(candidate)).unwrap(), expected);
        }
    }
}

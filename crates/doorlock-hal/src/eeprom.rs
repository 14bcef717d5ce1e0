//! 24C04/08/16 EEPROM as credential storage.
//!
//! These parts expose 256-byte blocks at consecutive I2C addresses. The three
//! high bits of an 11-bit memory address select the block (the device
//! address), the low eight bits are the word address sent on the wire.
//!
//! ```text
//!   memory address   0b0000_0BBB_WWWW_WWWW
//!   device address   0b101_0BBB            (7-bit: 0x50 | BBB)
//!   write            S [dev W] [word] [data] P
//!   read             S [dev W] [word] Sr [dev R] [data] P
//! ```

use doorlock_core::storage::{ByteStorage, EEPROM_SIZE, StorageError};
use embedded_hal::i2c::{self, I2c};

/// Base 7-bit address of the first block.
pub const BASE_ADDRESS: u8 = 0x50;

/// 7-bit device address for a memory address.
pub fn device_address(address: u16) -> u8 {
    BASE_ADDRESS | ((address & 0x0700) >> 8) as u8
}

/// EEPROM driver over any `embedded-hal` I2C bus.
pub struct Eeprom24x<I> {
    i2c: I,
    size: usize,
}

impl<I: I2c> Eeprom24x<I> {
    /// Driver for a 24C16 (2 KiB).
    pub fn new(i2c: I) -> Self {
        Self { i2c, size: EEPROM_SIZE }
    }

    /// Driver for a smaller part (24C04: 512, 24C08: 1024).
    pub fn with_size(i2c: I, size: usize) -> Self {
        Self { i2c, size: size.min(EEPROM_SIZE) }
    }

    /// Release the bus.
    pub fn free(self) -> I {
        self.i2c
    }

    /// Bus, for inspection.
    pub fn bus(&self) -> &I {
        &self.i2c
    }

    /// Bus, mutably.
    pub fn bus_mut(&mut self) -> &mut I {
        &mut self.i2c
    }

    fn locate(&self, address: u16) -> Result<(u8, u8), StorageError> {
        if usize::from(address) >= self.size {
            return Err(StorageError::OutOfRange { address });
        }
        let [_, word] = address.to_be_bytes();
        Ok((device_address(address), word))
    }
}

impl<I: I2c> ByteStorage for Eeprom24x<I> {
    fn read_byte(&mut self, address: u16) -> Result<u8, StorageError> {
        let (device, word) = self.locate(address)?;
        let mut data = [0u8];
        self.i2c
            .write_read(device, &[word], &mut data)
            .map_err(|err| classify(&err, address))?;
        tracing::trace!(address, byte = data[0], "eeprom read");
        Ok(data[0])
    }

    fn write_byte(&mut self, address: u16, byte: u8) -> Result<(), StorageError> {
        let (device, word) = self.locate(address)?;
        self.i2c.write(device, &[word, byte]).map_err(|err| classify(&err, address))?;
        tracing::trace!(address, byte, "eeprom write");
        Ok(())
    }
}

fn classify<E: i2c::Error>(err: &E, address: u16) -> StorageError {
    match err.kind() {
        i2c::ErrorKind::NoAcknowledge(_) => StorageError::Nack { address },
        kind => {
            tracing::debug!(?kind, address, "i2c bus error");
            StorageError::Bus { address }
        },
    }
}

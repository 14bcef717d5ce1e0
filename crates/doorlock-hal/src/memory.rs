//! A simulated 24C16 answering on the I2C bus.

use doorlock_core::storage::EEPROM_SIZE;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::eeprom::BASE_ADDRESS;

/// In-memory 24C16 that implements [`I2c`].
///
/// Follows the part's random-access protocol: the first written byte sets the
/// word pointer within the addressed block, further written bytes are stored
/// sequentially, and reads return bytes from the pointer onward.
#[derive(Debug, Clone)]
pub struct I2cMemory {
    cells: Vec<u8>,
    pointer: usize,
    nacks: usize,
    transactions: usize,
}

impl Default for I2cMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cMemory {
    /// Erased part (every cell 0xFF).
    pub fn new() -> Self {
        Self { cells: vec![0xFF; EEPROM_SIZE], pointer: 0, nacks: 0, transactions: 0 }
    }

    /// Part preloaded with `bytes` at `address`.
    pub fn with_contents(address: u16, bytes: &[u8]) -> Self {
        let mut memory = Self::new();
        let start = usize::from(address);
        for (cell, byte) in memory.cells.iter_mut().skip(start).zip(bytes) {
            *cell = *byte;
        }
        memory
    }

    /// Refuse the next `n` transactions with an address NACK.
    pub fn nack_next(&mut self, n: usize) {
        self.nacks = n;
    }

    /// Byte at `address`.
    pub fn peek(&self, address: u16) -> Option<u8> {
        self.cells.get(usize::from(address)).copied()
    }

    /// Transactions attempted so far.
    pub fn transactions(&self) -> usize {
        self.transactions
    }
}

impl ErrorType for I2cMemory {
    type Error = ErrorKind;
}

impl I2c for I2cMemory {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        self.transactions += 1;
        if self.nacks > 0 {
            self.nacks -= 1;
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        if address & !0x07 != BASE_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        let block = usize::from(address & 0x07) << 8;

        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    let Some((word, data)) = bytes.split_first() else { continue };
                    self.pointer = block | usize::from(*word);
                    for byte in data {
                        self.store(*byte)?;
                    }
                },
                Operation::Read(buffer) => {
                    for slot in buffer.iter_mut() {
                        *slot = self.load()?;
                    }
                },
            }
        }
        Ok(())
    }
}

impl I2cMemory {
    fn store(&mut self, byte: u8) -> Result<(), ErrorKind> {
        let cell = self
            .cells
            .get_mut(self.pointer)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data))?;
        *cell = byte;
        self.pointer += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<u8, ErrorKind> {
        let byte = self.cells.get(self.pointer).copied().ok_or(ErrorKind::Other)?;
        self.pointer += 1;
        Ok(byte)
    }
}


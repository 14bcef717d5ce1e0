//! Byte-addressable non-volatile storage.
//!
//! Each call to [`ByteStorage`] is one complete bus transaction (start,
//! address handshake, data phase, stop). Implementations report bus failures
//! as [`StorageError`]; they never substitute a made-up byte.

use thiserror::Error;

/// Failure of a single storage transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The address is outside the device.
    #[error("address 0x{address:04x} is out of range")]
    OutOfRange {
        /// Requested address
        address: u16,
    },

    /// The device did not acknowledge the transaction.
    #[error("no acknowledge at address 0x{address:04x}")]
    Nack {
        /// Address being accessed
        address: u16,
    },

    /// Arbitration loss, bus fault or other transport failure.
    #[error("bus error at address 0x{address:04x}")]
    Bus {
        /// Address being accessed
        address: u16,
    },
}

/// Atomic single-byte access to non-volatile memory.
pub trait ByteStorage {
    /// Read the byte at `address`.
    fn read_byte(&mut self, address: u16) -> Result<u8, StorageError>;

    /// Write `byte` at `address`.
    fn write_byte(&mut self, address: u16, byte: u8) -> Result<(), StorageError>;
}

impl<T: ByteStorage + ?Sized> ByteStorage for &mut T {
    fn read_byte(&mut self, address: u16) -> Result<u8, StorageError> {
        (**self).read_byte(address)
    }

    fn write_byte(&mut self, address: u16, byte: u8) -> Result<(), StorageError> {
        (**self).write_byte(address, byte)
    }
}

/// Size of a 24C16, the part fitted on the Control board.
pub const EEPROM_SIZE: usize = 2048;

/// In-memory EEPROM image with fault injection.
///
/// Starts erased (every byte 0xFF), like a factory-fresh part.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    cells: Vec<u8>,
    failing_reads: usize,
    failing_writes: usize,
    offline: bool,
    reads: usize,
    writes: usize,
}

impl MemoryStorage {
    /// Erased 2 KiB image.
    pub fn new() -> Self {
        Self::with_size(EEPROM_SIZE)
    }

    /// Erased image of `size` bytes.
    pub fn with_size(size: usize) -> Self {
        Self {
            cells: vec![0xFF; size],
            failing_reads: 0,
            failing_writes: 0,
            offline: false,
            reads: 0,
            writes: 0,
        }
    }

    /// Image with `bytes` pre-programmed starting at `address`.
    ///
    /// Bytes that would land past the end of the image are dropped.
    pub fn with_contents(address: u16, bytes: &[u8]) -> Self {
        let mut storage = Self::new();
        for (cell, byte) in storage.cells.iter_mut().skip(usize::from(address)).zip(bytes) {
            *cell = *byte;
        }
        storage
    }

    /// Make the next `n` reads fail with a NACK.
    pub fn fail_next_reads(&mut self, n: usize) {
        self.failing_reads = n;
    }

    /// Make the next `n` writes fail with a NACK.
    pub fn fail_next_writes(&mut self, n: usize) {
        self.failing_writes = n;
    }

    /// Simulate a disconnected device: every transaction fails until cleared.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Raw contents, bypassing fault injection.
    pub fn peek(&self, address: u16) -> Option<u8> {
        self.cells.get(address as usize).copied()
    }

    /// Successful read transactions so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Successful write transactions so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn check(&self, address: u16) -> Result<usize, StorageError> {
        if self.offline {
            return Err(StorageError::Bus { address });
        }
        let index = address as usize;
        if index >= self.cells.len() {
            return Err(StorageError::OutOfRange { address });
        }
        Ok(index)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStorage for MemoryStorage {
    fn read_byte(&mut self, address: u16) -> Result<u8, StorageError> {
        let index = self.check(address)?;
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(StorageError::Nack { address });
        }
        self.reads += 1;
        Ok(self.cells[index])
    }

    fn write_byte(&mut self, address: u16, byte: u8) -> Result<(), StorageError> {
        let index = self.check(address)?;
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(StorageError::Nack { address });
        }
        self.writes += 1;
        self.cells[index] = byte;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_erased() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.read_byte(0x0311), Ok(0xFF));
        assert_eq!(storage.read_byte(0x07FF), Ok(0xFF));
    }

    #[test]
    fn rejects_out_of_range() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.read_byte(0x0800), Err(StorageError::OutOfRange { address: 0x0800 }));
        assert_eq!(
            storage.write_byte(0x0800, 1),
            Err(StorageError::OutOfRange { address: 0x0800 })
        );
    }

    #[test]
    fn injected_faults_are_one_shot() {
        let mut storage = MemoryStorage::new();
        storage.fail_next_writes(1);
        assert_eq!(storage.write_byte(0x10, 7), Err(StorageError::Nack { address: 0x10 }));
        assert_eq!(storage.peek(0x10), Some(0xFF));
        assert_eq!(storage.write_byte(0x10, 7), Ok(()));
        assert_eq!(storage.peek(0x10), Some(7));
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn offline_fails_everything() {
        let mut storage = MemoryStorage::with_contents(0x0311, &[1, 2, 3, 4, 5]);
        storage.set_offline(true);
        assert_eq!(storage.read_byte(0x0311), Err(StorageError::Bus { address: 0x0311 }));
        storage.set_offline(false);
        assert_eq!(storage.read_byte(0x0311), Ok(1));
    }

    #[test]
    fn contents_past_the_end_are_dropped() {
        let last = (EEPROM_SIZE - 2) as u16;
        let storage = MemoryStorage::with_contents(last, &[1, 2, 3, 4, 5]);
        assert_eq!(storage.peek(last), Some(1));
        assert_eq!(storage.peek(last + 1), Some(2));
        assert_eq!(storage.peek(last + 2), None);

        let outside = MemoryStorage::with_contents(u16::MAX, &[7]);
        assert!((0..EEPROM_SIZE as u16).all(|a| outside.peek(a) == Some(0xFF)));
    }
}

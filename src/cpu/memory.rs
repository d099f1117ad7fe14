//! LC-3 memory subsystem.
//!
//! 65536 sixteen-bit words, addressed by a 16-bit address. The top page
//! (`xFE00`-`xFFFF`) holds device registers; only the keyboard pair is
//! modelled here.

use serde::{Deserialize, Serialize};

use crate::cpu::host::{DeviceError, Host};

/// The number of addressable words.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Keyboard status register. Bit 15 is set when a key is waiting.
pub const KBSR: u16 = 0xFE00;

/// Keyboard data register. Holds the last key reported through KBSR.
pub const KBDR: u16 = 0xFE02;

/// LC-3 main memory.
///
/// Serializes as a flat list of words; deserializing rejects any list that is
/// not exactly [`MEMORY_SIZE`] long.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<u16>", into = "Vec<u16>")]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a word, servicing memory-mapped devices.
    ///
    /// A read of KBSR asks the host for a key. If one is available it is
    /// latched into KBDR and KBSR reads `x8000`, otherwise KBSR reads zero.
    pub fn read(&mut self, addr: u16, host: &mut dyn Host) -> Result<u16, DeviceError> {
        if addr == KBSR {
            match host.poll_key()? {
                Some(key) => {
                    self.cells[KBSR as usize] = 0x8000;
                    self.cells[KBDR as usize] = key;
                }
                None => self.cells[KBSR as usize] = 0,
            }
        }
        Ok(self.cells[addr as usize])
    }

    /// Read a word without any device side effects.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    /// Write a word.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy `words` into memory starting at `origin`.
    ///
    /// Returns an error if the block would run past the last address.
    pub fn load(&mut self, origin: u16, words: &[u16]) -> Result<(), MemoryError> {
        let start = origin as usize;
        if start + words.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                origin,
                size: words.len(),
                available: MEMORY_SIZE - start,
            });
        }
        self.cells[start..start + words.len()].copy_from_slice(words);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<u16>> for Memory {
    type Error = MemoryError;

    fn try_from(cells: Vec<u16>) -> Result<Self, Self::Error> {
        if cells.len() != MEMORY_SIZE {
            return Err(MemoryError::WrongSize(cells.len()));
        }
        Ok(Self { cells })
    }
}

impl From<Memory> for Vec<u16> {
    fn from(mem: Memory) -> Self {
        mem.cells
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// Block does not fit between its origin and the end of memory.
    #[error("program of {size} words at x{origin:04X} exceeds available space {available}")]
    ProgramTooLarge {
        origin: u16,
        size: usize,
        available: usize,
    },

    /// A saved memory image with the wrong number of words.
    #[error("memory image holds {0} words, expected {}", MEMORY_SIZE)]
    WrongSize(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::host::TrapOutcome;
    use crate::cpu::Registers;
    use std::collections::VecDeque;

    struct Keys(VecDeque<u16>);

    impl Host for Keys {
        fn poll_key(&mut self) -> Result<Option<u16>, DeviceError> {
            Ok(self.0.pop_front())
        }

        fn trap(&mut self, _: u8, _: &mut Registers, _: &mut Memory) -> Result<TrapOutcome, DeviceError> {
            Ok(TrapOutcome::Continue)
        }
    }

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        let mut host = Keys(VecDeque::new());

        mem.write(0x3010, 42);
        assert_eq!(mem.read(0x3010, &mut host).unwrap(), 42);
        assert_eq!(mem.peek(0x3010), 42);
    }

    #[test]
    fn test_full_address_range() {
        let mut mem = Memory::new();
        mem.write(0x0000, 1);
        mem.write(0xFFFF, 2);
        assert_eq!(mem.peek(0x0000), 1);
        assert_eq!(mem.peek(0xFFFF), 2);
    }

    #[test]
    fn test_kbsr_polls_host_each_read() {
        let mut mem = Memory::new();
        let mut host = Keys(VecDeque::from([b'a' as u16]));

        assert_eq!(mem.read(KBSR, &mut host).unwrap(), 0x8000);
        assert_eq!(mem.read(KBDR, &mut host).unwrap(), b'a' as u16);

        // Queue is empty now, so the status must not stay stale.
        assert_eq!(mem.read(KBSR, &mut host).unwrap(), 0);
    }

    #[test]
    fn test_kbsr_stored_value_ignored() {
        let mut mem = Memory::new();
        let mut host = Keys(VecDeque::new());

        mem.write(KBSR, 0x8000);
        assert_eq!(mem.read(KBSR, &mut host).unwrap(), 0);
    }

    #[test]
    fn test_load() {
        let mut mem = Memory::new();
        mem.load(0x3000, &[1, 2, 3]).unwrap();

        assert_eq!(mem.peek(0x2FFF), 0);
        assert_eq!(mem.peek(0x3000), 1);
        assert_eq!(mem.peek(0x3001), 2);
        assert_eq!(mem.peek(0x3002), 3);
        assert_eq!(mem.peek(0x3003), 0);
    }

    #[test]
    fn test_load_past_end() {
        let mut mem = Memory::new();
        assert!(mem.load(0xFFFF, &[1]).is_ok());
        assert_eq!(
            mem.load(0xFFFF, &[1, 2]),
            Err(MemoryError::ProgramTooLarge { origin: 0xFFFF, size: 2, available: 1 })
        );
    }

    #[test]
    fn test_saved_memory_must_be_full_size() {
        assert_eq!(Memory::try_from(vec![0; 3]).err(), Some(MemoryError::WrongSize(3)));
        assert!(serde_json::from_str::<Memory>("[1, 2, 3]").is_err());

        let mut mem = Memory::new();
        mem.write(0x3000, 0x1234);
        let json = serde_json::to_string(&mem).unwrap();
        let restored: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.peek(0x3000), 0x1234);
        assert_eq!(restored.peek(0xFFFF), 0);
    }
}

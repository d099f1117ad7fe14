//! Standard LC-3 system routines.
//!
//! The LC-3 operating system exposes its console services through TRAP
//! vectors `x20`-`x25`. [`TrapTable`] implements them natively on top of a
//! [`Terminal`], and doubles as the [`Host`] the CPU runs against: it also
//! answers the keyboard polls behind KBSR.

mod buffer;
mod stream;

pub use buffer::BufferTerminal;
pub use stream::StreamTerminal;

use crate::cpu::host::{DeviceError, Host, TrapOutcome};
use crate::cpu::{Memory, Registers};

/// Prompt printed by the IN routine.
pub const IN_PROMPT: &str = "Enter a character: ";

/// Character source and sink behind the trap routines.
pub trait Terminal {
    /// Next character if one is already available.
    fn poll_char(&mut self) -> Result<Option<u8>, DeviceError>;

    /// Wait for the next character.
    fn read_char(&mut self) -> Result<u8, DeviceError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;

    fn flush(&mut self) -> Result<(), DeviceError>;

    /// Handle pending terminal events between run slices.
    fn pump(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// The trap vectors with a built-in routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapVector {
    /// Read a character into R0, no echo
    Getc = 0x20,
    /// Write the character in R0
    Out = 0x21,
    /// Write the string at R0, one character per word
    Puts = 0x22,
    /// Prompt, read and echo a character into R0
    In = 0x23,
    /// Write the string at R0, two characters per word
    Putsp = 0x24,
    /// Stop the machine
    Halt = 0x25,
}

impl TryFrom<u8> for TrapVector {
    type Error = u8;

    fn try_from(vector: u8) -> Result<Self, Self::Error> {
        match vector {
            0x20 => Ok(TrapVector::Getc),
            0x21 => Ok(TrapVector::Out),
            0x22 => Ok(TrapVector::Puts),
            0x23 => Ok(TrapVector::In),
            0x24 => Ok(TrapVector::Putsp),
            0x25 => Ok(TrapVector::Halt),
            other => Err(other),
        }
    }
}

/// Built-in trap routines over a terminal.
#[derive(Debug, Default)]
pub struct TrapTable<T> {
    terminal: T,
}

impl<T: Terminal> TrapTable<T> {
    pub fn new(terminal: T) -> Self {
        Self { terminal }
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    /// Run one routine.
    pub fn dispatch(
        &mut self,
        vector: TrapVector,
        regs: &mut Registers,
        mem: &Memory,
    ) -> Result<TrapOutcome, DeviceError> {
        match vector {
            TrapVector::Getc => {
                let c = self.terminal.read_char()?;
                regs.set_with_flags(0, c as u16);
            }

            TrapVector::Out => {
                self.terminal.write(&[regs.get(0) as u8])?;
                self.terminal.flush()?;
            }

            TrapVector::Puts => {
                let bytes: Vec<u8> = string_words(mem, regs.get(0))
                    .map(|word| word as u8)
                    .collect();
                self.terminal.write(&bytes)?;
                self.terminal.flush()?;
            }

            TrapVector::In => {
                self.terminal.write(IN_PROMPT.as_bytes())?;
                self.terminal.flush()?;
                let c = self.terminal.read_char()?;
                self.terminal.write(&[c])?;
                self.terminal.flush()?;
                regs.set_with_flags(0, c as u16);
            }

            TrapVector::Putsp => {
                let mut bytes = Vec::new();
                for word in string_words(mem, regs.get(0)) {
                    bytes.push(word as u8);
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        bytes.push(high);
                    }
                }
                self.terminal.write(&bytes)?;
                self.terminal.flush()?;
            }

            TrapVector::Halt => {
                self.terminal.write(b"HALT\n")?;
                self.terminal.flush()?;
                return Ok(TrapOutcome::Halt);
            }
        }

        Ok(TrapOutcome::Continue)
    }
}

/// Words from `start` up to, not including, the first zero word.
///
/// Stops after one full pass of memory if no terminator is found.
fn string_words(mem: &Memory, start: u16) -> impl Iterator<Item = u16> + '_ {
    (0..=u16::MAX)
        .map(move |i| mem.peek(start.wrapping_add(i)))
        .take_while(|&word| word != 0)
}

impl<T: Terminal> Host for TrapTable<T> {
    fn poll_key(&mut self) -> Result<Option<u16>, DeviceError> {
        Ok(self.terminal.poll_char()?.map(u16::from))
    }

    fn trap(
        &mut self,
        vector: u8,
        regs: &mut Registers,
        mem: &mut Memory,
    ) -> Result<TrapOutcome, DeviceError> {
        let routine = TrapVector::try_from(vector).map_err(DeviceError::UnknownTrap)?;
        self.dispatch(routine, regs, mem)
    }
}

//! LC-3 CPU registers.
//!
//! The LC-3 has:
//! - R0-R7: eight 16-bit general-purpose registers
//! - PC: 16-bit program counter
//! - COND: 3-bit condition register (N, Z, P)

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::cpu::arith::as_signed;

/// The conventional load address for user programs.
pub const PC_START: u16 = 0x3000;

/// Register used as the return address by JSR, JSRR and TRAP.
pub const LINK_REGISTER: u8 = 7;

bitflags! {
    /// Condition codes, in the same bit positions as the BR mask field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CondFlags: u16 {
        const POSITIVE = 0b001;
        const ZERO     = 0b010;
        const NEGATIVE = 0b100;
    }
}

impl CondFlags {
    /// The single flag describing `value` read as a signed word.
    pub fn from_value(value: u16) -> Self {
        match as_signed(value) {
            v if v < 0 => CondFlags::NEGATIVE,
            0 => CondFlags::ZERO,
            _ => CondFlags::POSITIVE,
        }
    }
}

impl Default for CondFlags {
    fn default() -> Self {
        CondFlags::ZERO
    }
}

impl std::fmt::Display for CondFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = if self.contains(CondFlags::NEGATIVE) { 'n' } else { '-' };
        let z = if self.contains(CondFlags::ZERO) { 'z' } else { '-' };
        let p = if self.contains(CondFlags::POSITIVE) { 'p' } else { '-' };
        write!(f, "{}{}{}", n, z, p)
    }
}

/// The LC-3 register file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7
    gpr: [u16; 8],

    /// Program counter
    pub pc: u16,

    /// Condition codes, exactly one bit set after any update
    pub cond: CondFlags,
}

impl Registers {
    /// Create a register file with zeroed registers, PC at [`PC_START`] and
    /// the Z flag set.
    pub fn new() -> Self {
        Self {
            gpr: [0; 8],
            pc: PC_START,
            cond: CondFlags::ZERO,
        }
    }

    /// Reset to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general-purpose register. Only the low 3 bits of `r` are used.
    #[inline]
    pub fn get(&self, r: u8) -> u16 {
        self.gpr[(r & 0x7) as usize]
    }

    /// Write a general-purpose register. Does not touch the flags.
    #[inline]
    pub fn set(&mut self, r: u8, value: u16) {
        self.gpr[(r & 0x7) as usize] = value;
    }

    /// Set the condition codes from the current value of register `r`.
    pub fn update_flags(&mut self, r: u8) {
        self.cond = CondFlags::from_value(self.get(r));
    }

    /// Write a register and update the flags from it.
    pub fn set_with_flags(&mut self, r: u8, value: u16) {
        self.set(r, value);
        self.update_flags(r);
    }

    /// Increment the program counter by one word, wrapping.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// All eight general-purpose registers.
    pub fn gprs(&self) -> &[u16; 8] {
        &self.gpr
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.gpr.iter().enumerate() {
            write!(f, "R{}=x{:04X} ", i, value)?;
        }
        write!(f, "PC=x{:04X} CC={}", self.pc, self.cond)
    }
}

//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 user-mode architecture:
//! - 65536 sixteen-bit memory words, with memory-mapped keyboard registers
//! - 8 general-purpose registers, a program counter and N/Z/P condition codes
//! - 15 instructions; RTI and the reserved opcode stop the machine

pub mod arith;
pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod host;

pub use memory::Memory;
pub use registers::{CondFlags, Registers};
pub use decode::{Instruction, Opcode, Operand};
pub use execute::{Cpu, CpuError, CpuState, Snapshot, StopReason};
pub use host::{CancelToken, DeviceError, Host, TrapOutcome};

//! # LC-3 Virtual Machine
//!
//! An interpreter for the LC-3, the 16-bit computer used to teach machine
//! organization. Programs run against a 64K-word memory, eight registers and
//! N/Z/P condition codes; console I/O goes through the standard TRAP routines.
//!
//! The [`cpu`] module is self-contained. Everything it needs from the outside
//! world comes through the [`Host`] trait, so it can be driven by the bundled
//! [`TrapTable`] or by any other implementation.

pub mod cpu;
pub mod image;
pub mod trap;

#[cfg(feature = "terminal")]
pub mod terminal;

// Re-export commonly used types
pub use cpu::{
    CancelToken, CondFlags, Cpu, CpuError, CpuState, DeviceError, Host, Instruction, Memory,
    Registers, StopReason, TrapOutcome,
};
pub use image::{load_image, Image, LoadError};
pub use trap::{BufferTerminal, StreamTerminal, Terminal, TrapTable, TrapVector};

#[cfg(feature = "terminal")]
pub use terminal::{Console, RawModeGuard};

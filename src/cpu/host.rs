//! The boundary between the CPU and the machine it is plugged into.
//!
//! The core never performs I/O itself. Memory-mapped keyboard reads and the
//! TRAP instruction are both forwarded to a [`Host`], and the run loop polls a
//! [`CancelToken`] so the embedding program can stop it from outside.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::cpu::{Memory, Registers};

/// What the CPU should do after a trap routine returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// Resume execution at the current PC.
    Continue,
    /// Stop the machine.
    Halt,
}

/// Services supplied by the embedding program.
pub trait Host {
    /// Non-blocking keyboard check, called on every read of KBSR.
    ///
    /// Returns the next key code if one is waiting.
    fn poll_key(&mut self) -> Result<Option<u16>, DeviceError>;

    /// Run the system routine for `vector`.
    ///
    /// The routine may read and write registers and memory. R7 already holds
    /// the return address when this is called.
    fn trap(
        &mut self,
        vector: u8,
        regs: &mut Registers,
        mem: &mut Memory,
    ) -> Result<TrapOutcome, DeviceError>;
}

/// Errors raised by a [`Host`]. All of them stop the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("unknown trap vector x{0:02X}")]
    UnknownTrap(u8),

    #[error("console input closed")]
    InputClosed,

    #[error("interrupted")]
    Interrupted,
}

impl From<std::io::Error> for DeviceError {
    fn from(e: std::io::Error) -> Self {
        DeviceError::Io(e.to_string())
    }
}

/// Shared stop request, checked by the run loop between instructions.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run loop to stop before the next instruction.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn test_io_error_conversion() {
        let e = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        assert_eq!(DeviceError::from(e), DeviceError::Io("pipe closed".into()));
    }
}

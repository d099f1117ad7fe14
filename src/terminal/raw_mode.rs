//! Scoped raw mode.

use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};
use log::{debug, warn};

/// Keeps the terminal in raw mode for as long as it is alive.
///
/// Dropping the guard restores the previous mode, which also happens while
/// unwinding from a panic.
#[derive(Debug)]
pub struct RawModeGuard {
    was_raw: bool,
}

impl RawModeGuard {
    /// Switch the terminal to raw mode.
    pub fn enable() -> std::io::Result<Self> {
        let was_raw = is_raw_mode_enabled()?;
        if !was_raw {
            enable_raw_mode()?;
            debug!("raw mode enabled");
        }
        Ok(Self { was_raw })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.was_raw {
            return;
        }
        match disable_raw_mode() {
            Ok(()) => debug!("raw mode disabled"),
            Err(e) => warn!("failed to restore terminal mode: {}", e),
        }
    }
}

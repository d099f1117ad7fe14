//! Interactive console for running LC-3 programs.
//!
//! Provides:
//! - A crossterm-backed [`Console`] implementing the trap routines' terminal
//! - A [`RawModeGuard`] that restores cooked mode on every exit path

mod console;
mod raw_mode;

pub use console::Console;
pub use raw_mode::RawModeGuard;

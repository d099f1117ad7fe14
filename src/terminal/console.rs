//! Console terminal backed by crossterm events.

use std::collections::VecDeque;
use std::io::{stdout, Stdout, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::cpu::host::{CancelToken, DeviceError};
use crate::trap::Terminal;

/// Reads keys from the terminal and writes to stdout.
///
/// In raw mode Ctrl-C arrives as a key instead of a signal; the console turns
/// it into a cancel request on the shared token.
pub struct Console {
    pending: VecDeque<u8>,
    out: Stdout,
    cancel: CancelToken,
}

impl Console {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            pending: VecDeque::new(),
            out: stdout(),
            cancel,
        }
    }

    fn handle(&mut self, ev: Event) {
        let Event::Key(key) = ev else { return };
        if key.kind == KeyEventKind::Release {
            return;
        }
        if is_interrupt(&key) {
            self.cancel.cancel();
            return;
        }
        if let Some(byte) = key_byte(&key) {
            self.pending.push_back(byte);
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

/// The ASCII byte an LC-3 program would see for a key press.
fn key_byte(key: &KeyEvent) -> Option<u8> {
    match key.code {
        KeyCode::Char(c) if c.is_ascii() => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                Some((c as u8) & 0x1F)
            } else {
                Some(c as u8)
            }
        }
        KeyCode::Enter => Some(b'\n'),
        KeyCode::Tab => Some(b'\t'),
        KeyCode::Backspace => Some(0x08),
        KeyCode::Esc => Some(0x1B),
        KeyCode::Delete => Some(0x7F),
        _ => None,
    }
}

impl Terminal for Console {
    fn poll_char(&mut self) -> Result<Option<u8>, DeviceError> {
        if self.pending.is_empty() {
            self.pump()?;
        }
        Ok(self.pending.pop_front())
    }

    fn read_char(&mut self) -> Result<u8, DeviceError> {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Ok(byte);
            }
            if self.cancel.is_cancelled() {
                return Err(DeviceError::Interrupted);
            }
            let ev = event::read()?;
            self.handle(ev);
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        // Raw mode does not translate newlines.
        for chunk in bytes.split_inclusive(|&b| b == b'\n') {
            match chunk.split_last() {
                Some((b'\n', line)) => {
                    self.out.write_all(line)?;
                    self.out.write_all(b"\r\n")?;
                }
                _ => self.out.write_all(chunk)?,
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        self.out.flush()?;
        Ok(())
    }

    /// Drain queued terminal events without blocking.
    fn pump(&mut self) -> Result<(), DeviceError> {
        while event::poll(Duration::ZERO)? {
            let ev = event::read()?;
            self.handle(ev);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_key_bytes() {
        assert_eq!(key_byte(&key(KeyCode::Char('a'), KeyModifiers::NONE)), Some(b'a'));
        assert_eq!(key_byte(&key(KeyCode::Char('A'), KeyModifiers::SHIFT)), Some(b'A'));
        assert_eq!(key_byte(&key(KeyCode::Enter, KeyModifiers::NONE)), Some(b'\n'));
        assert_eq!(key_byte(&key(KeyCode::Char('d'), KeyModifiers::CONTROL)), Some(0x04));
        assert_eq!(key_byte(&key(KeyCode::Char('é'), KeyModifiers::NONE)), None);
        assert_eq!(key_byte(&key(KeyCode::F(1), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_ctrl_c_cancels() {
        let cancel = CancelToken::new();
        let mut console = Console::new(cancel.clone());

        console.handle(Event::Key(key(KeyCode::Char('x'), KeyModifiers::NONE)));
        console.handle(Event::Key(key(KeyCode::Char('c'), KeyModifiers::CONTROL)));

        assert!(cancel.is_cancelled());
        assert_eq!(console.pending, VecDeque::from([b'x']));
        assert_eq!(console.read_char().unwrap(), b'x');
        assert_eq!(console.read_char(), Err(DeviceError::Interrupted));
    }
}

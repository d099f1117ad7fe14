//! Terminal over plain byte streams, for piped or redirected console I/O.

use std::io::{self, Read, Stdin, Stdout, Write};

use crate::cpu::host::DeviceError;
use crate::trap::Terminal;

/// Reads input bytes from `R` and writes output to `W`, unmodified.
///
/// A stream cannot report "no key yet", so a keyboard poll waits for the next
/// byte. End of input polls as no key and makes blocking reads fail with
/// [`DeviceError::InputClosed`].
#[derive(Debug)]
pub struct StreamTerminal<R, W> {
    input: R,
    output: W,
}

impl StreamTerminal<Stdin, Stdout> {
    /// Terminal over the process's standard input and output.
    pub fn stdio() -> Self {
        Self::new(io::stdin(), io::stdout())
    }
}

impl<R: Read, W: Write> StreamTerminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    fn next_byte(&mut self) -> Result<Option<u8>, DeviceError> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R: Read, W: Write> Terminal for StreamTerminal<R, W> {
    fn poll_char(&mut self) -> Result<Option<u8>, DeviceError> {
        self.next_byte()
    }

    fn read_char(&mut self) -> Result<u8, DeviceError> {
        self.next_byte()?.ok_or(DeviceError::InputClosed)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        self.output.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        self.output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_until_end_of_input() {
        let mut term = StreamTerminal::new(Cursor::new(b"ok".to_vec()), Vec::new());

        assert_eq!(term.poll_char().unwrap(), Some(b'o'));
        assert_eq!(term.read_char().unwrap(), b'k');
        assert_eq!(term.poll_char().unwrap(), None);
        assert_eq!(term.read_char(), Err(DeviceError::InputClosed));
    }

    #[test]
    fn test_output_is_not_translated() {
        let mut term = StreamTerminal::new(io::empty(), Vec::new());
        term.write(b"a\nb").unwrap();
        term.flush().unwrap();

        assert_eq!(term.output(), b"a\nb");
    }
}

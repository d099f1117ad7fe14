//! In-memory terminal for tests and non-interactive runs.

use std::collections::VecDeque;

use crate::cpu::host::DeviceError;
use crate::trap::Terminal;

/// A terminal whose input is a fixed byte queue and whose output is captured.
#[derive(Debug, Clone, Default)]
pub struct BufferTerminal {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal that will deliver `input` one byte at a time.
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Queue more input.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Everything written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded as UTF-8, lossily.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Terminal for BufferTerminal {
    fn poll_char(&mut self) -> Result<Option<u8>, DeviceError> {
        Ok(self.input.pop_front())
    }

    fn read_char(&mut self) -> Result<u8, DeviceError> {
        self.input.pop_front().ok_or(DeviceError::InputClosed)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

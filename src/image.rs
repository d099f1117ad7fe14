//! LC-3 object image format.
//!
//! An image is a flat sequence of big-endian 16-bit words:
//! - word 0 is the origin, the address the program is loaded at
//! - every following word is placed at origin, origin + 1, ...

use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::Cpu;

/// A parsed program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Load address of the first word.
    pub origin: u16,
    /// Program words, in memory order.
    pub words: Vec<u16>,
}

impl Image {
    /// Parse an image from raw file contents.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.len() % 2 != 0 {
            return Err(LoadError::OddLength(bytes.len()));
        }

        let mut words = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

        let origin = words.next().ok_or(LoadError::Empty)?;
        let words: Vec<u16> = words.collect();
        if words.is_empty() {
            return Err(LoadError::Empty);
        }

        let available = MEMORY_SIZE - origin as usize;
        if words.len() > available {
            return Err(LoadError::TooLarge {
                origin,
                size: words.len(),
                available,
            });
        }

        Ok(Self { origin, words })
    }

    /// Number of program words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether there are no program words. Never true after `from_bytes`.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Last address written by this image.
    pub fn end(&self) -> u16 {
        self.origin.wrapping_add(self.words.len() as u16).wrapping_sub(1)
    }

    /// Serialize back to the on-disk format.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Copy the image into the CPU's memory.
    pub fn load_into(&self, cpu: &mut Cpu) -> Result<(), LoadError> {
        cpu.load_program(self.origin, &self.words)?;
        Ok(())
    }
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| LoadError::IoError(format!("{}: {}", path.display(), e)))?;
    let image = Image::from_bytes(&bytes)?;
    debug!(
        "{}: {} words at x{:04X}-x{:04X}",
        path.display(),
        image.len(),
        image.origin,
        image.end()
    );
    Ok(image)
}

/// Errors that can occur while loading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("image is empty")]
    Empty,

    #[error("image has an odd number of bytes ({0})")]
    OddLength(usize),

    #[error("image of {size} words at x{origin:04X} exceeds available space {available}")]
    TooLarge {
        origin: u16,
        size: usize,
        available: usize,
    },

    #[error("{0}")]
    Memory(#[from] crate::cpu::memory::MemoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_big_endian() {
        let image = Image::from_bytes(&[0x30, 0x00, 0x12, 0x25, 0xF0, 0x25]).unwrap();

        assert_eq!(image.origin, 0x3000);
        assert_eq!(image.words, vec![0x1225, 0xF025]);
        assert_eq!(image.end(), 0x3001);
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(Image::from_bytes(&[]), Err(LoadError::Empty));
    }

    #[test]
    fn test_origin_only() {
        assert_eq!(Image::from_bytes(&[0x30, 0x00]), Err(LoadError::Empty));
    }

    #[test]
    fn test_odd_length() {
        assert_eq!(Image::from_bytes(&[0x30, 0x00, 0x12]), Err(LoadError::OddLength(3)));
    }

    #[test]
    fn test_too_large() {
        let bytes = [0xFF, 0xFF, 0x00, 0x01, 0x00, 0x02];
        assert_eq!(
            Image::from_bytes(&bytes),
            Err(LoadError::TooLarge { origin: 0xFFFF, size: 2, available: 1 })
        );
    }

    #[test]
    fn test_last_word_fits() {
        let image = Image::from_bytes(&[0xFF, 0xFF, 0xAB, 0xCD]).unwrap();
        assert_eq!(image.end(), 0xFFFF);
    }

    #[test]
    fn test_to_bytes() {
        let image = Image { origin: 0x3000, words: vec![0xF025] };
        assert_eq!(image.to_bytes(), vec![0x30, 0x00, 0xF0, 0x25]);
    }

    #[test]
    fn test_load_into_cpu() {
        let image = Image { origin: 0x4000, words: vec![1, 2] };
        let mut cpu = Cpu::new();

        image.load_into(&mut cpu).unwrap();

        assert_eq!(cpu.mem.peek(0x4000), 1);
        assert_eq!(cpu.mem.peek(0x4001), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = load_image("/nonexistent/path/program.obj").unwrap_err();
        assert!(matches!(err, LoadError::IoError(_)));
    }
}

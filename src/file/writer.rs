//! Growable big-endian output buffer for serializing class file structures.
//!
//! [`crate::file::writer::Writer`] is the serialization counterpart of
//! [`crate::file::parser::Parser`]. Length-prefixed structures (attributes, tables) are written
//! with a placeholder that is patched once the body size is known.

use crate::{
    file::io::{write_be_at, ClassIO},
    Result,
};

/// Append-only byte buffer with big-endian helpers and back-patching.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    data: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with preallocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a big-endian value.
    pub fn write_be<T: ClassIO>(&mut self, value: T) {
        self.data.extend_from_slice(value.to_be_bytes().as_ref());
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append a collection length as `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `len` does not fit into a `u16`.
    pub fn write_len_u16(&mut self, len: usize, what: &str) -> Result<()> {
        let len = u16::try_from(len)
            .map_err(|_| malformed_error!("Too many {} - {} exceeds u16 range", what, len))?;
        self.write_be(len);
        Ok(())
    }

    /// Append a `u16` count followed by the values.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the table holds more than `u16::MAX` values.
    pub fn write_u16_table(&mut self, values: &[u16], what: &str) -> Result<()> {
        self.write_len_u16(values.len(), what)?;
        for value in values {
            self.write_be(*value);
        }
        Ok(())
    }

    /// Overwrite a previously written value at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not lie inside written data.
    pub fn patch_be_at<T: ClassIO>(&mut self, offset: usize, value: T) -> Result<()> {
        let mut offset = offset;
        write_be_at(&mut self.data, &mut offset, value)
    }

    /// Borrow the bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the writer and return its bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_patch() -> Result<()> {
        let mut writer = Writer::new();
        writer.write_be(0_u32);
        writer.write_be(0x0102_u16);
        writer.write_bytes(&[0xFF]);
        writer.patch_be_at(0, 3_u32)?;

        assert_eq!(writer.as_slice(), &[0, 0, 0, 3, 1, 2, 0xFF]);
        Ok(())
    }

    #[test]
    fn u16_table_overflow() {
        let values = vec![0_u16; usize::from(u16::MAX) + 1];
        let mut writer = Writer::new();
        assert!(writer.write_u16_table(&values, "interfaces").is_err());
    }
}

//! Cursor-based byte stream parser for class file structures.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a bounds-checked cursor over
//! a byte slice. Every class file structure (constant pool entries, member tables, attributes,
//! annotation element values, stack map frames) is decoded through it.
//!
//! # Examples
//!
//! ```rust
//! use probeweave::Parser;
//!
//! let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_be::<u32>()?, 0xCAFE_BABE);
//! parser.advance_by(2)?;
//! assert_eq!(parser.read_be::<u16>()?, 52);
//! assert!(!parser.has_more_data());
//! # Ok::<(), probeweave::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, ClassIO},
    Result,
};

/// A bounds-checked cursor over a borrowed byte slice.
///
/// All reads advance the cursor; a failed read leaves the position untouched.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if unread bytes remain.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the cursor to an absolute position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if step > self.remaining() {
            return Err(out_of_bounds_error!());
        }

        self.position += step;
        Ok(())
    }

    /// Current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The complete underlying data.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Peek at the next byte without advancing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or_else(|| out_of_bounds_error!())
    }

    /// Read a big-endian value of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_be<T: ClassIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(out_of_bounds_error!());
        }

        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Read a `u16` count followed by that many `u16` values.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the table is truncated.
    pub fn read_u16_table(&mut self) -> Result<Vec<u16>> {
        let count = self.read_be::<u16>()?;
        let mut values = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            values.push(self.read_be::<u16>()?);
        }
        Ok(values)
    }

    /// Skip `len` bytes, aligning the cursor to the next multiple of `alignment` relative
    /// to `base`. Used for the padding of `tableswitch` and `lookupswitch`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the padding runs past the end of the data.
    pub fn align_from(&mut self, base: usize, alignment: usize) -> Result<()> {
        let relative = self.position.saturating_sub(base);
        let padding = (alignment - relative % alignment) % alignment;
        self.advance_by(padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn sequential_reads() -> Result<()> {
        let data = [0x00, 0x02, 0xAA, 0xBB, 0x01];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_be::<u16>()?, 2);
        assert_eq!(parser.read_bytes(2)?, &[0xAA, 0xBB]);
        assert_eq!(parser.peek_byte()?, 0x01);
        assert_eq!(parser.remaining(), 1);
        Ok(())
    }

    #[test]
    fn u16_table() -> Result<()> {
        let data = [0x00, 0x03, 0x00, 0x01, 0x00, 0x02, 0x01, 0x00];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_u16_table()?, vec![1, 2, 256]);
        assert!(!parser.has_more_data());
        Ok(())
    }

    #[test]
    fn truncated_bytes() {
        let data = [0x01, 0x02];
        let mut parser = Parser::new(&data);
        assert!(matches!(
            parser.read_bytes(3),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn alignment_padding() -> Result<()> {
        let data = [0u8; 12];
        let mut parser = Parser::new(&data);
        parser.seek(5)?;
        parser.align_from(0, 4)?;
        assert_eq!(parser.pos(), 8);

        parser.seek(9)?;
        parser.align_from(1, 4)?;
        assert_eq!(parser.pos(), 9);
        Ok(())
    }
}

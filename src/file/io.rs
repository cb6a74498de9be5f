//! Big-endian primitive I/O for class file structures.
//!
//! Class files store every multi-byte quantity in big-endian order (JVMS §4.1). This module
//! provides the [`crate::file::io::ClassIO`] trait for the primitive types that appear in the
//! format, together with bounds-checked helpers for reading values out of, and writing values
//! into, byte slices at a moving offset.
//!
//! # Key Components
//!
//! - [`crate::file::io::ClassIO`] - Conversion between primitives and their big-endian bytes
//! - [`crate::file::io::read_be`] / [`crate::file::io::read_be_at`] - Bounds-checked reads
//! - [`crate::file::io::write_be_at`] - Bounds-checked in-place writes
//!
//! # Examples
//!
//! ```rust
//! use probeweave::file::io::{read_be_at, write_be_at};
//!
//! let mut data = [0u8; 6];
//! let mut offset = 0;
//! write_be_at(&mut data, &mut offset, 0xCAFE_u16)?;
//! write_be_at(&mut data, &mut offset, 0xBABE_0001_u32)?;
//!
//! let mut offset = 0;
//! assert_eq!(read_be_at::<u16>(&data, &mut offset)?, 0xCAFE);
//! assert_eq!(read_be_at::<u32>(&data, &mut offset)?, 0xBABE_0001);
//! # Ok::<(), probeweave::Error>(())
//! ```

use crate::Result;

/// Trait for primitive types that can be decoded from, and encoded to, big-endian bytes.
///
/// Implemented for every fixed-width integer and float type used by the class file format.
pub trait ClassIO: Sized {
    /// The fixed-size byte array representation of the type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]> + AsRef<[u8]>;

    /// Decode a value from its big-endian bytes.
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Encode a value into its big-endian bytes.
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_class_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl ClassIO for $ty {
                type Bytes = [u8; $len];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_class_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
}

/// Reads a big-endian value of type `T` from the start of `data`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_be<T: ClassIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Reads a big-endian value of type `T` at `offset` and advances the offset past it.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_be_at<T: ClassIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;
    Ok(T::from_be_bytes(read))
}

/// Writes `value` in big-endian order at `offset` and advances the offset past it.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into `data` at `offset`.
pub fn write_be_at<T: ClassIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_be_bytes();
    let bytes = bytes.as_ref();
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn read_be_values() -> Result<()> {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34];
        let mut offset = 0;

        assert_eq!(read_be_at::<u32>(&data, &mut offset)?, 0xCAFE_BABE);
        assert_eq!(read_be_at::<u16>(&data, &mut offset)?, 52);
        assert_eq!(offset, 6);
        assert_eq!(read_be::<i8>(&data)?, -54);
        Ok(())
    }

    #[test]
    fn read_past_end_fails() {
        let data = [0x01, 0x02, 0x03];
        let mut offset = 2;
        let result = read_be_at::<u16>(&data, &mut offset);

        assert!(matches!(result, Err(Error::OutOfBounds { .. })));
        assert_eq!(offset, 2, "offset must not move on failure");
    }

    #[test]
    fn write_then_read_float() -> Result<()> {
        let mut data = [0u8; 12];
        let mut offset = 0;
        write_be_at(&mut data, &mut offset, 1.5_f32)?;
        write_be_at(&mut data, &mut offset, -2.25_f64)?;

        let mut offset = 0;
        assert_eq!(read_be_at::<f32>(&data, &mut offset)?, 1.5);
        assert_eq!(read_be_at::<f64>(&data, &mut offset)?, -2.25);
        Ok(())
    }

    #[test]
    fn write_overflow_fails() {
        let mut data = [0u8; 3];
        let mut offset = 0;
        assert!(write_be_at(&mut data, &mut offset, 7_u32).is_err());
    }
}

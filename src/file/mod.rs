//! Raw access to class file bytes.
//!
//! This module groups the low-level byte handling used by every other layer:
//!
//! - [`crate::file::io`] - big-endian primitive reads and writes
//! - [`crate::file::parser::Parser`] - bounds-checked cursor used by all decoders
//! - [`crate::file::writer::Writer`] - growable output buffer used by all encoders
//! - [`crate::file::UnitFile`] - a class file loaded from disk (memory-mapped) or memory
//!
//! In the load-time path the host hands the engine a borrowed slice and no `UnitFile` is
//! involved; `UnitFile` serves offline drivers such as the command line tool.

pub mod io;
mod memory;
pub mod parser;
mod physical;
pub mod writer;

use std::path::{Path, PathBuf};

use crate::{classfile::ClassFile, Error, Result};
use memory::Memory;
use physical::Physical;

/// Storage abstraction over the bytes of one loaded unit.
pub(crate) trait Backend: Send + Sync {
    /// The complete contents.
    fn data(&self) -> &[u8];

    /// Length of the contents.
    fn len(&self) -> usize;
}

/// A class file held either as a read-only memory map or an owned buffer.
///
/// # Examples
///
/// ```rust,no_run
/// use probeweave::UnitFile;
///
/// let unit = UnitFile::from_file("build/classes/com/acme/Pipeline.class".as_ref())?;
/// let class = unit.parse()?;
/// println!("{} has {} methods", class.name()?, class.methods.len());
/// # Ok::<(), probeweave::Error>(())
/// ```
pub struct UnitFile {
    path: Option<PathBuf>,
    backend: Box<dyn Backend>,
}

impl UnitFile {
    /// Memory-map the class file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be read and
    /// [`crate::Error::Empty`] if it has no contents.
    pub fn from_file(path: &Path) -> Result<UnitFile> {
        let backend = Physical::new(path)?;
        if backend.len() == 0 {
            return Err(Error::Empty);
        }

        Ok(UnitFile {
            path: Some(path.to_path_buf()),
            backend: Box::new(backend),
        })
    }

    /// Wrap an owned buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] if `data` is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<UnitFile> {
        if data.is_empty() {
            return Err(Error::Empty);
        }

        Ok(UnitFile {
            path: None,
            backend: Box::new(Memory::new(data)),
        })
    }

    /// The path this unit was loaded from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The raw bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Returns true if the unit holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.len() == 0
    }

    /// Parse the contents into a [`ClassFile`].
    ///
    /// # Errors
    ///
    /// Returns any parse error of [`ClassFile::parse`].
    pub fn parse(&self) -> Result<ClassFile> {
        ClassFile::parse(self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_rejected() -> Result<()> {
        assert!(matches!(UnitFile::from_mem(Vec::new()), Err(Error::Empty)));

        let temp = tempfile::NamedTempFile::new()?;
        assert!(matches!(UnitFile::from_file(temp.path()), Err(Error::Empty)));
        Ok(())
    }

    #[test]
    fn memory_unit() -> Result<()> {
        let unit = UnitFile::from_mem(vec![0xCA, 0xFE])?;
        assert_eq!(unit.len(), 2);
        assert!(unit.path().is_none());
        assert!(matches!(unit.parse(), Err(Error::OutOfBounds { .. })));
        Ok(())
    }
}

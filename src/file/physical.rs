use super::Backend;
use crate::{Error::FileError, Result};

use memmap2::Mmap;
use std::{fs, path::Path};

/// Memory-mapped file backend.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Map the file at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    #[allow(unsafe_code)]
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path).map_err(FileError)?;

        // SAFETY: the mapping is read-only. Callers that write back over their inputs read
        // them into owned buffers instead of mapping them.
        let mmap = unsafe { Mmap::map(&file) }.map_err(FileError)?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn physical_maps_contents() -> Result<()> {
        let mut temp = tempfile::NamedTempFile::new()?;
        temp.write_all(&[0xCA, 0xFE, 0xBA, 0xBE])?;
        temp.flush()?;

        let physical = Physical::new(temp.path())?;
        assert_eq!(physical.len(), 4);
        assert_eq!(physical.data(), &[0xCA, 0xFE, 0xBA, 0xBE]);
        Ok(())
    }

    #[test]
    fn physical_invalid_path() {
        match Physical::new("/nonexistent/path/to/Unit.class") {
            Err(FileError(io_error)) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected FileError"),
        }
    }
}

//! Backing storage for module images.
//!
//! A [`File`] owns the raw bytes of one compiled module, either memory-mapped from disk
//! ([`physical::Physical`]) or held in an owned buffer ([`memory::Memory`]). Everything above
//! this layer only ever sees `&[u8]` through [`File::data`].

pub mod io;
pub mod memory;
pub mod parser;
pub mod physical;

use std::path::{Path, PathBuf};

use crate::Result;

/// Storage abstraction for the bytes of a module image.
pub trait Backend: Send + Sync {
    /// Returns a slice of `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the complete data.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data.
    fn len(&self) -> usize;
}

/// The raw bytes of one compiled module, plus where they came from.
pub struct File {
    data: Box<dyn Backend>,
    path: Option<PathBuf>,
}

impl File {
    /// Memory-map the module at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, or
    /// [`crate::Error::Empty`] if it has no content.
    pub fn from_path(path: &Path) -> Result<File> {
        let physical = physical::Physical::new(path)?;
        if physical.len() == 0 {
            return Err(crate::Error::Empty);
        }

        Ok(File {
            data: Box::new(physical),
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an in-memory image.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if `data` is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        if data.is_empty() {
            return Err(crate::Error::Empty);
        }

        Ok(File {
            data: Box::new(memory::Memory::new(data)),
            path: None,
        })
    }

    /// The complete image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// A bounds-checked sub-slice of the image.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// Length of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the image holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Path the image was loaded from, `None` for in-memory images.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_file() {
        let file = File::from_mem(vec![1, 2, 3, 4]).unwrap();
        assert_eq!(file.len(), 4);
        assert_eq!(file.data_slice(1, 2).unwrap(), &[2, 3]);
        assert!(file.data_slice(3, 2).is_err());
        assert!(file.path().is_none());
    }

    #[test]
    fn empty_inputs_rejected() {
        assert!(matches!(File::from_mem(Vec::new()), Err(crate::Error::Empty)));
    }
}

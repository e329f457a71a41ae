//! In-process native memory arena.

use std::ops::Range;

use crate::{marshal::NativeMemory, model::layout::align_up, Error, Result};

/// Address of the first byte of every [`NativeHeap`]; zero stays the null address.
pub const HEAP_BASE: u64 = 0x0001_0000;

/// A growable, bump-allocated [`NativeMemory`].
///
/// Allocations are never freed; the heap lives as long as the values marshalled through it.
#[derive(Debug, Default, Clone)]
pub struct NativeHeap {
    data: Vec<u8>,
}

impl NativeHeap {
    /// An empty heap.
    #[must_use]
    pub fn new() -> Self {
        NativeHeap { data: Vec::new() }
    }

    /// Bytes at `address`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the range was never allocated.
    pub fn bytes(&self, address: u64, len: usize) -> Result<&[u8]> {
        let range = self.range(address, len)?;
        Ok(&self.data[range])
    }

    /// Number of bytes allocated so far, padding included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn range(&self, address: u64, len: usize) -> Result<Range<usize>> {
        let start = address
            .checked_sub(HEAP_BASE)
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or(Error::OutOfBounds)?;
        let end = start.checked_add(len).ok_or(Error::OutOfBounds)?;
        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }
        Ok(start..end)
    }
}

impl NativeMemory for NativeHeap {
    fn read(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        let range = self.range(address, buffer.len())?;
        buffer.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write(&mut self, address: u64, data: &[u8]) -> Result<()> {
        let range = self.range(address, data.len())?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    fn allocate(&mut self, size: usize, alignment: usize) -> Result<u64> {
        let start = align_up(self.data.len(), alignment.max(1));
        let end = start.checked_add(size.max(1)).ok_or(Error::OutOfBounds)?;
        self.data.resize(end, 0);
        Ok(HEAP_BASE + start as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_allocation() {
        let mut heap = NativeHeap::new();
        let first = heap.allocate(3, 1).unwrap();
        let second = heap.allocate(8, 8).unwrap();
        assert_eq!(first, HEAP_BASE);
        assert_eq!(second, HEAP_BASE + 8);
        assert_eq!(heap.len(), 16);
        assert_eq!(heap.bytes(second, 8).unwrap(), &[0; 8]);
    }

    #[test]
    fn bounds() {
        let mut heap = NativeHeap::new();
        let address = heap.allocate(4, 4).unwrap();
        assert!(heap.write(address, &[1, 2, 3, 4]).is_ok());
        assert!(heap.write(address + 2, &[1, 2, 3]).is_err());
        assert!(heap.bytes(0, 1).is_err());
        assert!(heap.bytes(HEAP_BASE - 1, 1).is_err());
    }
}

//! GUID heap (`#GUID`).
//!
//! A sequence of 16-byte GUIDs addressed by a 1-based index. Index `0` means "no GUID".

use crate::{Error::OutOfBounds, Result};

/// View over the `#GUID` heap.
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Create a `Guid` view from the raw heap bytes.
    ///
    /// # Errors
    /// Returns an error if the heap length is not a multiple of 16.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() % 16 != 0 {
            return Err(malformed_error!(
                "Invalid #GUID heap size - {}",
                data.len()
            ));
        }

        Ok(Guid { data })
    }

    /// Returns the GUID at the 1-based `index`.
    ///
    /// GUIDs have to be built, hence no view is possible.
    ///
    /// # Errors
    /// Returns an error if the index is 0 or past the end of the heap.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index < 1 || index * 16 > self.data.len() {
            return Err(OutOfBounds);
        }

        let offset = (index - 1) * 16;
        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[offset..offset + 16]);

        Ok(uguid::Guid::from_bytes(buffer))
    }

    /// Number of GUIDs in the heap.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.len() / 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data : [u8; 32] = [
            0x8e, 0x90, 0x37, 0xd4, 0xe6, 0x65, 0x7c, 0x48, 0x97, 0x35, 0x7b, 0xdf, 0xf6, 0x99, 0xbe, 0xa5,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];

        let guids = Guid::from(&data).unwrap();

        assert_eq!(guids.count(), 2);
        assert_eq!(
            guids.get(1).unwrap(),
            uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5")
        );
        assert_eq!(
            guids.get(2).unwrap(),
            uguid::guid!("AAAAAAAA-AAAA-AAAA-AAAA-AAAAAAAAAAAA")
        );
        assert!(guids.get(0).is_err());
        assert!(guids.get(3).is_err());
    }

    #[test]
    fn invalid() {
        assert!(Guid::from(&[0u8; 15]).is_err());
    }
}

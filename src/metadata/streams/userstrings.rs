//! User string heap (`#US`).
//!
//! String literals loaded by `ldstr`. Each entry is a compressed byte length, the UTF-16LE code
//! units, and a trailing flag byte that is counted in the length.

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// View over the `#US` heap.
pub struct UserStrings<'a> {
    data: &'a [u8],
}

impl<'a> UserStrings<'a> {
    /// Create a `UserStrings` view from the raw heap bytes.
    ///
    /// # Errors
    /// Returns an error if the heap is empty or does not start with the empty entry.
    pub fn from(data: &'a [u8]) -> Result<UserStrings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #US heap"));
        }

        Ok(UserStrings { data })
    }

    /// Decode the literal at `index`.
    ///
    /// # Errors
    /// Returns an error if the index or the declared length is out of bounds, or the length
    /// cannot hold whole UTF-16 code units plus the flag byte.
    pub fn get(&self, index: usize) -> Result<String> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let length = parser.read_compressed_uint()? as usize;
        if length == 0 {
            return Ok(String::new());
        }

        if length % 2 != 1 {
            return Err(malformed_error!(
                "Invalid user string length {} at index - {}",
                length,
                index
            ));
        }

        if length > parser.remaining() {
            return Err(OutOfBounds);
        }

        parser.read_utf16((length - 1) / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = [
            0x00,
            0x05, 0x68, 0x00, 0x69, 0x00, 0x00,
            0x01, 0x00,
        ];
        let strings = UserStrings::from(&data).unwrap();

        assert_eq!(strings.get(1).unwrap(), "hi");
        assert_eq!(strings.get(7).unwrap(), "");
    }

    #[test]
    fn invalid() {
        assert!(UserStrings::from(&[]).is_err());

        let data = [0x00, 0x04, 0x68, 0x00, 0x69, 0x00];
        let strings = UserStrings::from(&data).unwrap();
        assert!(strings.get(1).is_err());
        assert!(strings.get(10).is_err());
    }
}

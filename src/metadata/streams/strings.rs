//! String heap (`#Strings`).
//!
//! Identifier names, namespaces and member names are stored as NUL-terminated UTF-8 strings.
//! Index `0` always addresses the empty string.

use std::{ffi::CStr, str};

use crate::{Error::OutOfBounds, Result};

/// View over the `#Strings` heap.
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Create a `Strings` view from the raw heap bytes.
    ///
    /// # Errors
    /// Returns an error if the heap is empty or does not start with the empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Get the string at `index`.
    ///
    /// # Errors
    /// Returns an error if the index is out of bounds or the string is not valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        match CStr::from_bytes_until_nul(&self.data[index..]) {
            Ok(result) => match result.to_str() {
                Ok(result) => Ok(result),
                Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
            },
            Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let data = b"\0Game\0AMyActor\0";
        let strings = Strings::from(data).unwrap();

        assert_eq!(strings.get(0).unwrap(), "");
        assert_eq!(strings.get(1).unwrap(), "Game");
        assert_eq!(strings.get(6).unwrap(), "AMyActor");
        assert!(strings.get(100).is_err());
    }

    #[test]
    fn invalid() {
        assert!(Strings::from(&[]).is_err());
        assert!(Strings::from(b"abc\0").is_err());

        let strings = Strings::from(b"\0abc").unwrap();
        assert!(strings.get(1).is_err());
    }
}

//! Low-level byte stream parser for module images, signatures and attribute blobs.
//!
//! [`Parser`] is a cursor over a byte slice. Every read is bounds checked, so a truncated or
//! hostile blob surfaces as [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`]
//! rather than a panic.
//!
//! # Examples
//!
//! ```rust
//! use bindweaver::Parser;
//!
//! let data = [0x01, 0x02, 0x80, 0x95];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u16>()?, 0x0201);
//! assert_eq!(parser.read_compressed_uint()?, 0x95);
//! # Ok::<(), bindweaver::Error>(())
//! ```

use widestring::U16Str;

use crate::{
    file::io::{read_le_at, ImageIO},
    metadata::token::Token,
    Result,
};

/// A cursor-based binary data parser for module image structures.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes left after the cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the current position to the specified index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Peek at the next byte without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is at or beyond the data length.
    pub fn peek_byte(&self) -> Result<u8> {
        if self.position >= self.data.len() {
            return Err(out_of_bounds_error!());
        }
        Ok(self.data[self.position])
    }

    /// Align the position to a specific boundary.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if aligning would exceed the data length.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: ImageIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read `len` raw bytes and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(len)?;
        Ok(&self.data[start..start + len])
    }

    /// Read a compressed unsigned integer (ECMA-335 II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the leading byte is not a valid length marker.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            let value = ((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte);
            return Ok(value);
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            let value = ((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3;
            return Ok(value);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a `TypeDefOrRef` compressed token (ECMA-335 II.23.2.8).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the tag bits do not name TypeDef, TypeRef or TypeSpec.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed_token = self.read_compressed_uint()?;

        let table: u32 = match compressed_token & 0x3 {
            0x0 => 0x0200_0000, // TypeDef
            0x1 => 0x0100_0000, // TypeRef
            0x2 => 0x1B00_0000, // TypeSpec
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed_token
                ))
            }
        };

        Ok(Token::new(table | (compressed_token >> 2)))
    }

    /// Read a NUL-terminated UTF-8 string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no terminator is found or the bytes are not UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<&'a str> {
        let rest = &self.data[self.position..];
        let Some(end) = rest.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!(
                "Unterminated string at offset {}",
                self.position
            ));
        };

        let value = std::str::from_utf8(&rest[..end])
            .map_err(|_| malformed_error!("Invalid UTF-8 string at offset {}", self.position))?;
        self.position += end + 1;
        Ok(value)
    }

    /// Read a compressed-length prefixed UTF-8 string (SerString, ECMA-335 II.23.3).
    ///
    /// A leading `0xFF` denotes the null string and yields `None`.
    ///
    /// # Errors
    /// Returns an error if the declared length exceeds the remaining data.
    pub fn read_ser_string(&mut self) -> Result<Option<String>> {
        if self.peek_byte()? == 0xFF {
            self.advance_by(1)?;
            return Ok(None);
        }

        let length = self.read_compressed_uint()? as usize;
        if length > self.remaining() {
            return Err(malformed_error!(
                "String length {} exceeds available data {}",
                length,
                self.remaining()
            ));
        }

        let bytes = self.read_bytes(length)?;
        Ok(Some(String::from_utf8_lossy(bytes).into_owned()))
    }

    /// Read `units` UTF-16LE code units and decode them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data is too short.
    pub fn read_utf16(&mut self, units: usize) -> Result<String> {
        let mut buffer = Vec::with_capacity(units);
        for _ in 0..units {
            buffer.push(self.read_le::<u16>()?);
        }
        Ok(U16Str::from_slice(&buffer).to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_values() {
        let data = [0x03, 0x80, 0x80, 0xC0, 0x00, 0x40, 0x00];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_compressed_uint().unwrap(), 0x03);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x80);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x4000);
        assert!(!parser.has_more_data());
        assert!(parser.read_compressed_uint().is_err());
    }

    #[test]
    fn compressed_tokens() {
        let data = [0x08, 0x05, 0x0A];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0200_0002));
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0100_0001));
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x1B00_0002));
    }

    #[test]
    fn strings() {
        let data = [b'F', b'o', b'o', 0x00, 0x03, b'B', b'a', b'r', 0xFF];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_string_utf8().unwrap(), "Foo");
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some("Bar"));
        assert_eq!(parser.read_ser_string().unwrap(), None);
    }

    #[test]
    fn truncated_reads_fail() {
        let data = [0x05, b'a'];
        let mut parser = Parser::new(&data);
        assert!(parser.read_ser_string().is_err());

        let mut parser = Parser::new(&[0x01]);
        assert!(parser.read_le::<u32>().is_err());
        assert_eq!(parser.pos(), 0);
        assert!(parser.read_string_utf8().is_err());
    }
}

//! Stream headers of a module image.
//!
//! Each header records the offset and size of a stream relative to the start of the image,
//! followed by the NUL-terminated stream name padded to a 4-byte boundary.

use crate::{file::parser::Parser, Result};

/// Names of the streams a module image may carry.
pub const STREAM_NAMES: [&str; 6] = ["#Strings", "#US", "#Blob", "#GUID", "#~", "#IL"];

/// A single stream header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream from the start of the image
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Read a stream header at the current position of `parser`, leaving the parser positioned
    /// after the name padding.
    ///
    /// # Errors
    /// Returns an error if the header is truncated or names an unknown stream.
    pub fn read(parser: &mut Parser) -> Result<StreamHeader> {
        let offset = parser.read_le::<u32>()?;
        let size = parser.read_le::<u32>()?;
        let name = parser.read_string_utf8()?.to_string();
        parser.align(4)?;

        if !STREAM_NAMES.iter().any(|valid_name| name == *valid_name) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader { offset, size, name })
    }

    /// Number of bytes this header occupies in the image.
    #[must_use]
    pub fn encoded_size(name: &str) -> usize {
        8 + (name.len() + 1).next_multiple_of(4)
    }

    /// Append the encoded header to `buffer`.
    pub fn write(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.offset.to_le_bytes());
        buffer.extend_from_slice(&self.size.to_le_bytes());
        let padded = (self.name.len() + 1).next_multiple_of(4);
        buffer.extend_from_slice(self.name.as_bytes());
        buffer.resize(buffer.len() + padded - self.name.len(), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,
        ];

        let mut parser = Parser::new(&header_bytes);
        let parsed_header = StreamHeader::read(&mut parser).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#~");
        assert_eq!(parser.pos(), 12);
    }

    #[test]
    fn crafted_invalid() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x24, 0x7E, 0x00, 0x00,
        ];

        let mut parser = Parser::new(&header_bytes);
        assert!(StreamHeader::read(&mut parser).is_err());
    }

    #[test]
    fn sizes() {
        assert_eq!(StreamHeader::encoded_size("#~"), 12);
        assert_eq!(StreamHeader::encoded_size("#Strings"), 20);
        assert_eq!(StreamHeader::encoded_size("#GUID"), 16);
    }
}

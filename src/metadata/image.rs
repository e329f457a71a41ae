//! Module image container.
//!
//! A module image starts with a 12-byte header (`BMOD` magic, major and minor version, stream
//! count and a reserved word), followed by the stream headers and the stream payloads.
//! [`ModuleImage`] validates the container and exposes borrowed views over every stream.

use crate::{
    file::parser::Parser,
    metadata::{
        streams::{Blob, Guid, StreamHeader, Strings, UserStrings},
        tables::Tables,
    },
    Error::{Empty, NotSupported, OutOfBounds},
    Result,
};

/// Magic bytes at the start of every module image.
pub const IMAGE_MAGIC: [u8; 4] = *b"BMOD";
/// Major format version understood by this crate.
pub const IMAGE_MAJOR_VERSION: u16 = 1;
/// Minor format version written by [`ModuleImage::encode`].
pub const IMAGE_MINOR_VERSION: u16 = 0;

const HEADER_SIZE: usize = 12;
const EMPTY_HEAP: [u8; 1] = [0];

/// A parsed module image borrowing from its backing buffer.
pub struct ModuleImage<'a> {
    /// Major format version
    pub major_version: u16,
    /// Minor format version
    pub minor_version: u16,
    /// `#Strings` heap
    pub strings: Strings<'a>,
    /// `#Blob` heap
    pub blob: Blob<'a>,
    /// `#US` heap
    pub user_strings: UserStrings<'a>,
    /// `#GUID` heap
    pub guids: Guid<'a>,
    /// Raw `#US` bytes, kept for owned copies
    pub user_strings_data: &'a [u8],
    /// Decoded `#~` stream
    pub tables: Tables,
    /// `#IL` stream
    pub il: &'a [u8],
}

impl<'a> ModuleImage<'a> {
    /// Parse a module image.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for empty input, [`crate::Error::NotSupported`] for a
    /// foreign magic or major version, and [`crate::Error::Malformed`] or
    /// [`crate::Error::OutOfBounds`] for structural damage.
    pub fn parse(data: &'a [u8]) -> Result<ModuleImage<'a>> {
        if data.is_empty() {
            return Err(Empty);
        }
        if data.len() < HEADER_SIZE {
            return Err(OutOfBounds);
        }
        if data[..4] != IMAGE_MAGIC {
            return Err(NotSupported);
        }

        let mut parser = Parser::new(data);
        parser.advance_by(4)?;
        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let stream_count = parser.read_le::<u16>()?;
        let _reserved = parser.read_le::<u16>()?;

        if major_version != IMAGE_MAJOR_VERSION {
            return Err(NotSupported);
        }

        let mut strings = None;
        let mut blob = None;
        let mut user_strings = None;
        let mut guids = None;
        let mut tables = None;
        let mut il = None;

        for _ in 0..stream_count {
            let header = StreamHeader::read(&mut parser)?;

            let start = header.offset as usize;
            let Some(end) = start.checked_add(header.size as usize) else {
                return Err(OutOfBounds);
            };
            if end > data.len() {
                return Err(OutOfBounds);
            }
            let stream = &data[start..end];

            let slot = match header.name.as_str() {
                "#Strings" => &mut strings,
                "#Blob" => &mut blob,
                "#US" => &mut user_strings,
                "#GUID" => &mut guids,
                "#~" => &mut tables,
                _ => &mut il,
            };

            if slot.replace(stream).is_some() {
                return Err(malformed_error!("Duplicate stream - {}", header.name));
            }
        }

        let Some(strings) = strings else {
            return Err(malformed_error!("Module image has no #Strings stream"));
        };
        let Some(tables) = tables else {
            return Err(malformed_error!("Module image has no #~ stream"));
        };

        let user_strings_data = user_strings.unwrap_or(&EMPTY_HEAP);

        Ok(ModuleImage {
            major_version,
            minor_version,
            strings: Strings::from(strings)?,
            blob: Blob::from(blob.unwrap_or(&EMPTY_HEAP))?,
            user_strings: UserStrings::from(user_strings_data)?,
            guids: Guid::from(guids.unwrap_or(&[]))?,
            user_strings_data,
            tables: Tables::read(tables)?,
            il: il.unwrap_or(&[]),
        })
    }

    /// Assemble a module image from named stream payloads.
    ///
    /// Streams are laid out in the given order, each aligned to 4 bytes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(streams: &[(&str, &[u8])]) -> Vec<u8> {
        let headers_size: usize = streams
            .iter()
            .map(|(name, _)| StreamHeader::encoded_size(name))
            .sum();

        let mut offset = HEADER_SIZE + headers_size;
        let mut headers = Vec::with_capacity(streams.len());
        for (name, payload) in streams {
            headers.push(StreamHeader {
                offset: offset as u32,
                size: payload.len() as u32,
                name: (*name).to_string(),
            });
            offset = (offset + payload.len()).next_multiple_of(4);
        }

        let mut buffer = Vec::with_capacity(offset);
        buffer.extend_from_slice(&IMAGE_MAGIC);
        buffer.extend_from_slice(&IMAGE_MAJOR_VERSION.to_le_bytes());
        buffer.extend_from_slice(&IMAGE_MINOR_VERSION.to_le_bytes());
        buffer.extend_from_slice(&(streams.len() as u16).to_le_bytes());
        buffer.extend_from_slice(&0u16.to_le_bytes());
        for header in &headers {
            header.write(&mut buffer);
        }
        for (_, payload) in streams {
            buffer.extend_from_slice(payload);
            buffer.resize(buffer.len().next_multiple_of(4), 0);
        }

        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::ModuleRaw;

    fn minimal() -> Vec<u8> {
        let tables = Tables {
            module: vec![ModuleRaw { name: 1, mvid: 0 }],
            ..Default::default()
        };
        let table_data = tables.write();
        ModuleImage::encode(&[("#~", &table_data), ("#Strings", b"\0Game\0")])
    }

    #[test]
    fn crafted() {
        let data = minimal();
        let image = ModuleImage::parse(&data).unwrap();

        assert_eq!(image.major_version, 1);
        assert_eq!(image.tables.module.len(), 1);
        assert_eq!(image.strings.get(1).unwrap(), "Game");
        assert!(image.il.is_empty());
        assert_eq!(image.guids.count(), 0);
    }

    #[test]
    fn invalid() {
        assert!(matches!(ModuleImage::parse(&[]), Err(Empty)));
        assert!(matches!(ModuleImage::parse(b"BMOD"), Err(OutOfBounds)));
        assert!(matches!(
            ModuleImage::parse(b"MZ\x90\0\0\0\0\0\0\0\0\0"),
            Err(NotSupported)
        ));

        let mut data = minimal();
        data[4] = 2;
        assert!(matches!(ModuleImage::parse(&data), Err(NotSupported)));
    }

    #[test]
    fn truncated_stream() {
        let data = minimal();
        assert!(ModuleImage::parse(&data[..data.len() - 8]).is_err());
    }

    #[test]
    fn missing_strings() {
        let tables = Tables::default().write();
        let data = ModuleImage::encode(&[("#~", &tables)]);
        assert!(ModuleImage::parse(&data).is_err());
    }
}

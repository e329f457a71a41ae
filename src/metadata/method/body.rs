use crate::{
    file::io::{read_le, write_le},
    metadata::method::{MethodBodyFlags, TINY_MAX_CODE_SIZE, TINY_MAX_STACK},
    Error::OutOfBounds,
    Result,
};

/// A decoded method body header with its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Size of the code in bytes
    pub size_code: usize,
    /// Size of the header in bytes
    pub size_header: usize,
    /// Maximum evaluation stack depth
    pub max_stack: usize,
    /// Header uses the fat format
    pub is_fat: bool,
    /// Locals are zero-initialized
    pub is_init_local: bool,
    /// The CIL code
    pub code: Vec<u8>,
}

impl MethodBody {
    /// Decode a method body starting at the beginning of `data`.
    ///
    /// Extra data sections (exception handlers) are not decoded.
    ///
    /// # Errors
    /// Returns an error if the header is neither tiny nor fat, or the code runs past `data`.
    pub fn from(data: &[u8]) -> Result<MethodBody> {
        if data.is_empty() {
            return Err(malformed_error!("Provided data for body parsing is empty"));
        }

        let first_byte = read_le::<u8>(data)?;
        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b_00000011_u8)) {
            MethodBodyFlags::TINY_FORMAT => {
                let size_code = (first_byte >> 2) as usize;
                if size_code + 1 > data.len() {
                    return Err(OutOfBounds);
                }

                Ok(MethodBody {
                    size_code,
                    size_header: 1,
                    max_stack: TINY_MAX_STACK as usize,
                    is_fat: false,
                    is_init_local: false,
                    code: data[1..=size_code].to_vec(),
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                if data.len() < 12 {
                    return Err(OutOfBounds);
                }

                let first_duo = read_le::<u16>(data)?;
                let size_header = ((first_duo >> 12) * 4) as usize;
                if size_header < 12 {
                    return Err(malformed_error!(
                        "Fat method header too small - {}",
                        size_header
                    ));
                }

                let size_code = read_le::<u32>(&data[4..])? as usize;
                let Some(end) = size_header.checked_add(size_code) else {
                    return Err(OutOfBounds);
                };
                if data.len() < end {
                    return Err(OutOfBounds);
                }

                let flags_header =
                    MethodBodyFlags::from_bits_truncate(first_duo & 0b_0000111111111111_u16);

                Ok(MethodBody {
                    size_code,
                    size_header,
                    max_stack: read_le::<u16>(&data[2..])? as usize,
                    is_fat: true,
                    is_init_local: flags_header.contains(MethodBodyFlags::INIT_LOCALS),
                    code: data[size_header..end].to_vec(),
                })
            }
            _ => Err(malformed_error!(
                "MethodHeader is neither FAT nor TINY - {}",
                first_byte
            )),
        }
    }

    /// Total size of header and code.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size_code + self.size_header
    }
}

/// Encode `code` with the smallest header that can describe it.
///
/// # Errors
/// Returns an error if the code is larger than a fat header can describe.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_method_body(code: &[u8], max_stack: u16) -> Result<Vec<u8>> {
    if code.len() <= TINY_MAX_CODE_SIZE && max_stack <= TINY_MAX_STACK {
        let mut buffer = Vec::with_capacity(code.len() + 1);
        buffer.push(((code.len() as u8) << 2) | MethodBodyFlags::TINY_FORMAT.bits() as u8);
        buffer.extend_from_slice(code);
        return Ok(buffer);
    }

    let Ok(size_code) = u32::try_from(code.len()) else {
        return Err(malformed_error!("Method body too large - {}", code.len()));
    };

    let mut buffer = Vec::with_capacity(code.len() + 12);
    write_le(
        &mut buffer,
        (3u16 << 12) | MethodBodyFlags::FAT_FORMAT.bits() | MethodBodyFlags::INIT_LOCALS.bits(),
    );
    write_le(&mut buffer, max_stack);
    write_le(&mut buffer, size_code);
    write_le(&mut buffer, 0u32);
    buffer.extend_from_slice(code);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny() {
        let data = [0x0E, 0x02, 0x17, 0x2A, 0xFF];
        let body = MethodBody::from(&data).unwrap();

        assert!(!body.is_fat);
        assert_eq!(body.size_code, 3);
        assert_eq!(body.size(), 4);
        assert_eq!(body.code, vec![0x02, 0x17, 0x2A]);
    }

    #[test]
    fn fat() {
        let code = vec![0x00; 100];
        let data = encode_method_body(&code, 16).unwrap();
        let body = MethodBody::from(&data).unwrap();

        assert!(body.is_fat);
        assert!(body.is_init_local);
        assert_eq!(body.max_stack, 16);
        assert_eq!(body.size_header, 12);
        assert_eq!(body.code.len(), 100);
    }

    #[test]
    fn encode_prefers_tiny() {
        let data = encode_method_body(&[0x2A], 8).unwrap();
        assert_eq!(data, vec![0x06, 0x2A]);
    }

    #[test]
    fn invalid() {
        assert!(MethodBody::from(&[]).is_err());
        assert!(MethodBody::from(&[0x0E, 0x02]).is_err());
        assert!(MethodBody::from(&[0x01]).is_err());
        assert!(MethodBody::from(&[0x03, 0x30, 0x08, 0x00]).is_err());
    }
}

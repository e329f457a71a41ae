//! Little-endian primitive IO for module images.
//!
//! [`ImageIO`] abstracts over the fixed-width integer and float types that appear in module
//! images, and [`read_le_at`] / [`write_le`] are the bounds-checked primitives every higher
//! level reader and the [`crate::metadata::builder::ModuleBuilder`] are built on.

use crate::{Error::OutOfBounds, Result};

/// Fixed-width value that can be decoded from and encoded into little-endian bytes.
pub trait ImageIO: Sized + Copy {
    /// Byte array representation of the type
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Decode a value from its little-endian representation
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Encode a value into its little-endian representation
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_image_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl ImageIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_image_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
}

/// Reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: ImageIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a value of type `T` in little-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes at `offset`.
pub fn read_le_at<T: ImageIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Appends the little-endian encoding of `value` to `buffer`.
pub fn write_le<T: ImageIO>(buffer: &mut Vec<u8>, value: T) {
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Overwrites `buffer` at `offset` with the little-endian encoding of `value`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit at `offset`.
pub fn write_le_at<T: ImageIO>(buffer: &mut [u8], offset: usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(OutOfBounds);
    };
    if end > buffer.len() {
        return Err(OutOfBounds);
    }

    buffer[offset..end].copy_from_slice(bytes);
    Ok(())
}

/// Appends an ECMA-335 compressed unsigned integer (II.23.2) to `buffer`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `value` exceeds the 29-bit encodable range.
pub fn write_compressed_uint(buffer: &mut Vec<u8>, value: u32) -> Result<()> {
    if value < 0x80 {
        buffer.push(value as u8);
    } else if value < 0x4000 {
        buffer.push(0x80 | (value >> 8) as u8);
        buffer.push((value & 0xFF) as u8);
    } else if value < 0x2000_0000 {
        buffer.push(0xC0 | (value >> 24) as u8);
        buffer.push(((value >> 16) & 0xFF) as u8);
        buffer.push(((value >> 8) & 0xFF) as u8);
        buffer.push((value & 0xFF) as u8);
    } else {
        return Err(malformed_error!(
            "Value {} exceeds the compressed integer range",
            value
        ));
    }
    Ok(())
}

//! Name-based GUIDs.

use md5::{Digest, Md5};
use uguid::Guid;

/// Namespace all derived GUIDs are hashed under.
const NAMESPACE: [u8; 16] = [
    0x6b, 0x1d, 0x3f, 0x52, 0x8e, 0x4a, 0x4c, 0x0b, 0x9d, 0x3e, 0x71, 0x25, 0x0c, 0xa4, 0x5e, 0x13,
];

/// Derive an RFC 4122 version 3 GUID from `key`.
///
/// The result is a pure function of `key`, stable across runs and machines.
#[must_use]
pub fn name_guid(key: &str) -> Guid {
    let mut hasher = Md5::new();
    hasher.update(NAMESPACE);
    hasher.update(key.as_bytes());
    let mut rfc: [u8; 16] = [0; 16];
    rfc.copy_from_slice(&hasher.finalize());

    rfc[6] = (rfc[6] & 0x0F) | 0x30;
    rfc[8] = (rfc[8] & 0x3F) | 0x80;

    // Guid stores the first three groups little-endian.
    Guid::from_bytes([
        rfc[3], rfc[2], rfc[1], rfc[0], rfc[5], rfc[4], rfc[7], rfc[6], rfc[8], rfc[9], rfc[10],
        rfc[11], rfc[12], rfc[13], rfc[14], rfc[15],
    ])
}

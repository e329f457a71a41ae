//! Method body header flags (ECMA-335 II.25.4).

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Flags of a method body header
    pub struct MethodBodyFlags: u16 {
        /// Tiny header, code size in the upper 6 bits
        const TINY_FORMAT = 0x2;
        /// Fat header, 12 bytes
        const FAT_FORMAT = 0x3;
        /// Extra data sections follow the code
        const MORE_SECTS = 0x8;
        /// Locals are zero-initialized
        const INIT_LOCALS = 0x10;
    }
}

/// Largest code size that fits a tiny header.
pub const TINY_MAX_CODE_SIZE: usize = 63;
/// Largest evaluation stack depth a tiny header implies.
pub const TINY_MAX_STACK: u16 = 8;

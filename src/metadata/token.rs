//! Metadata tokens.
//!
//! A token packs a table identifier into its top byte and a 1-based row index into the
//! remaining 24 bits. `0x70xxxxxx` tokens address the user-string heap instead of a table.

use std::fmt;

use crate::metadata::tables::TableId;

/// A metadata token (`table << 24 | row`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(pub u32);

/// Table byte used by `ldstr` operands to address the user-string heap.
pub const USER_STRING_TABLE: u8 = 0x70;

impl Token {
    /// The null token.
    pub const NULL: Token = Token(0);

    /// Create a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token for `row` (1-based) of `table`.
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// Raw token value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Table byte of the token.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// 1-based row index of the token.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns `true` for the null token (or any token with row 0).
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }

    /// Returns `true` if the token addresses `table`.
    #[must_use]
    pub fn is_table(&self, table: TableId) -> bool {
        self.table() == table as u8
    }

    /// Encode as a `TypeDefOrRef` coded index (ECMA-335 II.23.2.8).
    ///
    /// Returns `None` if the token does not address TypeDef, TypeRef or TypeSpec.
    #[must_use]
    pub fn to_type_def_or_ref(&self) -> Option<u32> {
        let tag = match self.table() {
            0x02 => 0,
            0x01 => 1,
            0x1B => 2,
            _ => return None,
        };
        Some((self.row() << 2) | tag)
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token::from_parts(TableId::MethodDef, 5);
        assert_eq!(token.value(), 0x0600_0005);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.row(), 5);
        assert!(token.is_table(TableId::MethodDef));
        assert!(!token.is_null());
        assert!(Token::NULL.is_null());
    }

    #[test]
    fn coded_index() {
        assert_eq!(Token::new(0x0200_0003).to_type_def_or_ref(), Some(12));
        assert_eq!(Token::new(0x0100_0001).to_type_def_or_ref(), Some(5));
        assert_eq!(Token::new(0x1B00_0002).to_type_def_or_ref(), Some(10));
        assert_eq!(Token::new(0x0600_0001).to_type_def_or_ref(), None);
    }

    #[test]
    fn display() {
        assert_eq!(Token::new(0x0200_0001).to_string(), "0x02000001");
    }
}

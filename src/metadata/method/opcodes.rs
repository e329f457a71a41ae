//! CIL instruction decoding.
//!
//! Only operand sizes are modelled: the decoder walks an instruction stream, yielding each
//! opcode with its operand, and stops at the first opcode it does not know.

use crate::{file::parser::Parser, metadata::token::Token, Result};

/// Opcodes referenced by name elsewhere in the crate.
#[allow(non_snake_case, missing_docs)]
pub mod OPCODE {
    pub const NOP: u16 = 0x00;
    pub const LDARG_0: u16 = 0x02;
    pub const LDNULL: u16 = 0x14;
    pub const LDC_I4_M1: u16 = 0x15;
    pub const LDC_I4_0: u16 = 0x16;
    pub const LDC_I4_8: u16 = 0x1E;
    pub const LDC_I4_S: u16 = 0x1F;
    pub const LDC_I4: u16 = 0x20;
    pub const LDC_I8: u16 = 0x21;
    pub const LDC_R4: u16 = 0x22;
    pub const LDC_R8: u16 = 0x23;
    pub const CALL: u16 = 0x28;
    pub const RET: u16 = 0x2A;
    pub const LDSTR: u16 = 0x72;
    pub const NEWOBJ: u16 = 0x73;
    pub const STFLD: u16 = 0x7D;
    pub const PREFIX: u16 = 0xFE;
}

/// Shape of an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand
    None,
    /// 1-byte signed integer or short branch
    Int8,
    /// 1-byte unsigned index
    UInt8,
    /// 2-byte unsigned index
    UInt16,
    /// 4-byte signed integer or long branch
    Int32,
    /// 8-byte signed integer
    Int64,
    /// 4-byte float
    Float32,
    /// 8-byte float
    Float64,
    /// Metadata or user-string token
    Token,
    /// Jump table
    Switch,
}

/// A decoded instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Integer operand, widened
    Integer(i64),
    /// Floating-point operand, widened
    Float(f64),
    /// Token operand
    Token(Token),
    /// Jump table targets
    Switch(Vec<i32>),
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset of the instruction within the code
    pub offset: usize,
    /// Opcode, two-byte opcodes as `0xFExx`
    pub opcode: u16,
    /// Decoded operand
    pub operand: Operand,
}

impl Instruction {
    /// The constant an `ldc.*` instruction pushes, if this is one.
    #[must_use]
    pub fn integer_constant(&self) -> Option<i64> {
        match (self.opcode, &self.operand) {
            (OPCODE::LDC_I4_M1, _) => Some(-1),
            (OPCODE::LDC_I4_0..=OPCODE::LDC_I4_8, _) => {
                Some(i64::from(self.opcode - OPCODE::LDC_I4_0))
            }
            (OPCODE::LDC_I4_S | OPCODE::LDC_I4 | OPCODE::LDC_I8, Operand::Integer(value)) => {
                Some(*value)
            }
            _ => None,
        }
    }

    /// The constant an `ldc.r4`/`ldc.r8` instruction pushes, if this is one.
    #[must_use]
    pub fn float_constant(&self) -> Option<f64> {
        match (self.opcode, &self.operand) {
            (OPCODE::LDC_R4 | OPCODE::LDC_R8, Operand::Float(value)) => Some(*value),
            _ => None,
        }
    }

    /// The token operand, if any.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match &self.operand {
            Operand::Token(token) => Some(*token),
            _ => None,
        }
    }
}

/// Operand shape of a single-byte opcode, `None` if the opcode is not defined.
#[must_use]
pub fn operand_type(opcode: u8) -> Option<OperandType> {
    Some(match opcode {
        0x00..=0x0D | 0x14..=0x1E | 0x25 | 0x26 | 0x2A => OperandType::None,
        0x0E..=0x13 => OperandType::UInt8,
        0x1F | 0x2B..=0x37 | 0xDE => OperandType::Int8,
        0x20 | 0x38..=0x44 | 0xDD => OperandType::Int32,
        0x21 => OperandType::Int64,
        0x22 => OperandType::Float32,
        0x23 => OperandType::Float64,
        0x27..=0x29 | 0x6F..=0x75 | 0x79 | 0x7B..=0x81 | 0x8C | 0x8D | 0x8F | 0xA3..=0xA5 | 0xC2
        | 0xC6 | 0xD0 => OperandType::Token,
        0x45 => OperandType::Switch,
        0x46..=0x6E | 0x76 | 0x7A | 0x82..=0x8B | 0x8E | 0x90..=0xA2 | 0xB3..=0xBA | 0xC3
        | 0xD1..=0xDC | 0xDF | 0xE0 => OperandType::None,
        _ => return None,
    })
}

/// Operand shape of a `0xFE`-prefixed opcode, `None` if the opcode is not defined.
#[must_use]
pub fn operand_type_prefixed(opcode: u8) -> Option<OperandType> {
    Some(match opcode {
        0x00..=0x05 | 0x0F | 0x11 | 0x13 | 0x14 | 0x17 | 0x18 | 0x1A | 0x1D | 0x1E => {
            OperandType::None
        }
        0x06 | 0x07 | 0x15 | 0x16 | 0x1C => OperandType::Token,
        0x09..=0x0E => OperandType::UInt16,
        0x12 | 0x19 => OperandType::UInt8,
        _ => return None,
    })
}

fn read_operand(parser: &mut Parser, kind: OperandType) -> Result<Operand> {
    Ok(match kind {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Integer(i64::from(parser.read_le::<i8>()?)),
        OperandType::UInt8 => Operand::Integer(i64::from(parser.read_le::<u8>()?)),
        OperandType::UInt16 => Operand::Integer(i64::from(parser.read_le::<u16>()?)),
        OperandType::Int32 => Operand::Integer(i64::from(parser.read_le::<i32>()?)),
        OperandType::Int64 => Operand::Integer(parser.read_le::<i64>()?),
        OperandType::Float32 => Operand::Float(f64::from(parser.read_le::<f32>()?)),
        OperandType::Float64 => Operand::Float(parser.read_le::<f64>()?),
        OperandType::Token => Operand::Token(Token::new(parser.read_le::<u32>()?)),
        OperandType::Switch => {
            let count = parser.read_le::<u32>()? as usize;
            if count.saturating_mul(4) > parser.remaining() {
                return Err(out_of_bounds_error!());
            }
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                targets.push(parser.read_le::<i32>()?);
            }
            Operand::Switch(targets)
        }
    })
}

/// Decode `code` into instructions.
///
/// Decoding stops without error at the first undefined opcode or truncated operand; the
/// instructions decoded up to that point are returned.
#[must_use]
pub fn decode_instructions(code: &[u8]) -> Vec<Instruction> {
    let mut parser = Parser::new(code);
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        let offset = parser.pos();
        let Ok(first) = parser.read_le::<u8>() else {
            break;
        };

        let (opcode, kind) = if u16::from(first) == OPCODE::PREFIX {
            let Ok(second) = parser.read_le::<u8>() else {
                break;
            };
            (0xFE00 | u16::from(second), operand_type_prefixed(second))
        } else {
            (u16::from(first), operand_type(first))
        };

        let Some(kind) = kind else {
            log::debug!("Stopping CIL decode at unknown opcode 0x{opcode:04X} (offset {offset})");
            break;
        };

        let Ok(operand) = read_operand(&mut parser, kind) else {
            log::debug!("Stopping CIL decode at truncated operand (offset {offset})");
            break;
        };

        instructions.push(Instruction {
            offset,
            opcode,
            operand,
        });
    }

    instructions
}

/// Incremental CIL encoder.
#[derive(Debug, Default, Clone)]
pub struct InstructionEncoder {
    code: Vec<u8>,
}

impl InstructionEncoder {
    /// Create an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an opcode without operand.
    pub fn emit(&mut self, opcode: u16) -> &mut Self {
        if opcode > 0xFF {
            self.code.extend_from_slice(&opcode.to_be_bytes());
        } else {
            self.code.push(opcode.to_le_bytes()[0]);
        }
        self
    }

    /// Emit an opcode with a token operand.
    pub fn emit_token(&mut self, opcode: u16, token: Token) -> &mut Self {
        self.emit(opcode);
        self.code.extend_from_slice(&token.value().to_le_bytes());
        self
    }

    /// Emit the shortest `ldc.i4` form for `value`.
    pub fn ldc_i4(&mut self, value: i32) -> &mut Self {
        match value {
            -1 => self.emit(OPCODE::LDC_I4_M1),
            0..=8 => self.emit(OPCODE::LDC_I4_0 + u16::try_from(value).unwrap_or_default()),
            -128..=127 => {
                self.emit(OPCODE::LDC_I4_S);
                self.code
                    .extend_from_slice(&i8::try_from(value).unwrap_or_default().to_le_bytes());
                self
            }
            _ => {
                self.emit(OPCODE::LDC_I4);
                self.code.extend_from_slice(&value.to_le_bytes());
                self
            }
        }
    }

    /// Emit `ldc.i8`.
    pub fn ldc_i8(&mut self, value: i64) -> &mut Self {
        self.emit(OPCODE::LDC_I8);
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Emit `ldc.r4`.
    pub fn ldc_r4(&mut self, value: f32) -> &mut Self {
        self.emit(OPCODE::LDC_R4);
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Emit `ldc.r8`.
    pub fn ldc_r8(&mut self, value: f64) -> &mut Self {
        self.emit(OPCODE::LDC_R8);
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// The encoded code.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Consume the encoder and return the code.
    #[must_use]
    pub fn into_code(self) -> Vec<u8> {
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_constructor() {
        let mut encoder = InstructionEncoder::new();
        encoder
            .emit(OPCODE::LDARG_0)
            .ldc_i4(42)
            .emit_token(OPCODE::STFLD, Token::new(0x0400_0001))
            .emit(OPCODE::LDARG_0)
            .ldc_r4(1.5)
            .emit_token(OPCODE::STFLD, Token::new(0x0400_0002))
            .emit(OPCODE::RET);

        let instructions = decode_instructions(encoder.code());
        assert_eq!(instructions.len(), 7);
        assert_eq!(instructions[1].opcode, OPCODE::LDC_I4_S);
        assert_eq!(instructions[1].integer_constant(), Some(42));
        assert_eq!(instructions[2].token(), Some(Token::new(0x0400_0001)));
        assert_eq!(instructions[4].float_constant(), Some(1.5));
        assert_eq!(instructions[6].opcode, OPCODE::RET);
    }

    #[test]
    fn short_constants() {
        let mut encoder = InstructionEncoder::new();
        encoder.ldc_i4(-1).ldc_i4(0).ldc_i4(8).ldc_i4(1000).ldc_i8(1 << 40);

        let values: Vec<_> = decode_instructions(encoder.code())
            .iter()
            .filter_map(Instruction::integer_constant)
            .collect();
        assert_eq!(values, vec![-1, 0, 8, 1000, 1 << 40]);
    }

    #[test]
    fn prefixed() {
        let code = [0xFE, 0x01, 0xFE, 0x15, 0x01, 0x00, 0x00, 0x02, 0x2A];
        let instructions = decode_instructions(&code);
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].opcode, 0xFE01);
        assert_eq!(instructions[1].token(), Some(Token::new(0x0200_0001)));
    }

    #[test]
    fn stops_at_unknown() {
        let code = [0x00, 0x24, 0x2A];
        let instructions = decode_instructions(&code);
        assert_eq!(instructions.len(), 1);

        let truncated = [0x20, 0x01];
        assert!(decode_instructions(&truncated).is_empty());
    }

    #[test]
    fn switch() {
        let code = [0x45, 0x02, 0, 0, 0, 0x01, 0, 0, 0, 0x02, 0, 0, 0, 0x2A];
        let instructions = decode_instructions(&code);
        assert_eq!(instructions[0].operand, Operand::Switch(vec![1, 2]));
        assert_eq!(instructions.len(), 2);
    }
}

//! Method bodies and CIL instructions.
//!
//! Only what the default-value scanner needs: body headers, operand-size aware decoding,
//! and an encoder for authoring constructor bodies.

mod body;
mod opcodes;
mod types;

pub use body::{encode_method_body, MethodBody};
pub use opcodes::{
    decode_instructions, operand_type, operand_type_prefixed, Instruction, InstructionEncoder,
    Operand, OperandType, OPCODE,
};
pub use types::*;

//! JVM bytecode toolkit.
//!
//! - [`opcodes`] - the opcode table and named opcode constants
//! - [`decoder`] - instruction decoding for disassembly and structural checks
//! - [`assembler`] - a fluent assembler with stack depth tracking for generated code
//! - [`stackmap`] - `StackMapTable` frames and their offset adjustment

pub mod assembler;
pub mod decoder;
pub mod opcodes;
pub mod stackmap;

pub use assembler::CodeAssembler;
pub use decoder::{decode_instruction, decode_stream, Instruction, Operand};
pub use opcodes::{Opcode, OperandType, OPCODES};
pub use stackmap::{StackMapFrame, StackMapTable, VerificationType};

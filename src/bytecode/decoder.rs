//! Bytecode decoding.
//!
//! Turns a method's code array into a linear sequence of [`Instruction`]s. Offsets are relative
//! to the start of the code array, which is also the base for `tableswitch`/`lookupswitch`
//! padding. Branch operands are resolved into absolute targets.
//!
//! # Examples
//!
//! ```rust
//! use probeweave::bytecode::{decode_stream, Operand};
//!
//! // iconst_0; ifeq +4; nop; return
//! let code = [0x03, 0x99, 0x00, 0x04, 0x00, 0xB1];
//! let instructions = decode_stream(&code)?;
//! assert_eq!(instructions.len(), 4);
//! assert_eq!(instructions[1].mnemonic, "ifeq");
//! assert_eq!(instructions[1].operand, Operand::Branch(5));
//! # Ok::<(), probeweave::Error>(())
//! ```

use std::fmt;

use crate::{
    bytecode::opcodes::{opcode, OperandType, WIDE},
    file::parser::Parser,
    Result,
};

/// Decoded instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No operand
    None,
    /// Integer immediate (`bipush`, `sipush`)
    Immediate(i32),
    /// Local variable index
    Local(u16),
    /// Constant pool index
    Constant(u16),
    /// Absolute branch target
    Branch(u32),
    /// `iinc` local index and increment
    Increment {
        /// Local variable index
        local: u16,
        /// Signed increment
        delta: i16,
    },
    /// `invokeinterface` method ref and argument slot count
    Interface {
        /// Constant pool index of the method ref
        index: u16,
        /// Argument slot count including the receiver
        count: u8,
    },
    /// `newarray` primitive type code
    ArrayType(u8),
    /// `multianewarray` class and dimension count
    MultiArray {
        /// Constant pool index of the array class
        index: u16,
        /// Number of dimensions
        dimensions: u8,
    },
    /// `tableswitch` absolute targets
    TableSwitch {
        /// Default target
        default: u32,
        /// Lowest key
        low: i32,
        /// Targets for `low..=high`
        targets: Vec<u32>,
    },
    /// `lookupswitch` absolute targets
    LookupSwitch {
        /// Default target
        default: u32,
        /// `(match, target)` pairs
        pairs: Vec<(i32, u32)>,
    },
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the first byte (including a `wide` prefix) in the code array
    pub offset: u32,
    /// Encoded size in bytes
    pub size: u32,
    /// Opcode byte (the modified opcode for `wide` forms)
    pub opcode: u8,
    /// Mnemonic of the opcode
    pub mnemonic: &'static str,
    /// True if the instruction was prefixed by `wide`
    pub wide: bool,
    /// Decoded operand
    pub operand: Operand,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}: ", self.offset)?;
        if self.wide {
            f.write_str("wide ")?;
        }
        f.write_str(self.mnemonic)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Immediate(value) => write!(f, " {value}"),
            Operand::Local(index) => write!(f, " {index}"),
            Operand::Constant(index) => write!(f, " #{index}"),
            Operand::Branch(target) => write!(f, " {target}"),
            Operand::Increment { local, delta } => write!(f, " {local}, {delta}"),
            Operand::Interface { index, count } => write!(f, " #{index}, {count}"),
            Operand::ArrayType(code) => write!(f, " {code}"),
            Operand::MultiArray { index, dimensions } => write!(f, " #{index}, {dimensions}"),
            Operand::TableSwitch {
                default,
                low,
                targets,
            } => {
                write!(f, " {{ low {low}, default {default}, targets {targets:?} }}")
            }
            Operand::LookupSwitch { default, pairs } => {
                write!(f, " {{ default {default}, pairs {pairs:?} }}")
            }
        }
    }
}

fn branch_target(offset: u32, delta: i32) -> Result<u32> {
    offset
        .checked_add_signed(delta)
        .ok_or_else(|| malformed_error!("Branch at {} leaves the code array", offset))
}

/// Decode the instruction at the parser's position.
///
/// The parser must wrap exactly the code array, because switch padding is aligned relative to
/// its start.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] for undefined opcodes or invalid `wide` forms, and
/// [`crate::Error::OutOfBounds`] if operands are truncated.
pub fn decode_instruction(parser: &mut Parser) -> Result<Instruction> {
    let start = parser.pos();
    let offset = u32::try_from(start).map_err(|_| out_of_bounds_error!())?;
    let mut byte = parser.read_be::<u8>()?;
    let wide = byte == WIDE;
    if wide {
        byte = parser.read_be::<u8>()?;
    }

    let info = opcode(byte).ok_or_else(|| malformed_error!("Invalid opcode 0x{:02X}", byte))?;
    if wide && !matches!(info.operand, OperandType::Local | OperandType::Increment) {
        return Err(malformed_error!(
            "Opcode {} cannot be modified by wide",
            info.mnemonic
        ));
    }

    let operand = match info.operand {
        OperandType::None => Operand::None,
        OperandType::Byte => Operand::Immediate(i32::from(parser.read_be::<i8>()?)),
        OperandType::Short => Operand::Immediate(i32::from(parser.read_be::<i16>()?)),
        OperandType::Local if wide => Operand::Local(parser.read_be::<u16>()?),
        OperandType::Local => Operand::Local(u16::from(parser.read_be::<u8>()?)),
        OperandType::ConstantU8 => Operand::Constant(u16::from(parser.read_be::<u8>()?)),
        OperandType::Constant => Operand::Constant(parser.read_be::<u16>()?),
        OperandType::Branch => {
            let delta = i32::from(parser.read_be::<i16>()?);
            Operand::Branch(branch_target(offset, delta)?)
        }
        OperandType::BranchWide => Operand::Branch(branch_target(offset, parser.read_be()?)?),
        OperandType::Increment if wide => Operand::Increment {
            local: parser.read_be::<u16>()?,
            delta: parser.read_be::<i16>()?,
        },
        OperandType::Increment => Operand::Increment {
            local: u16::from(parser.read_be::<u8>()?),
            delta: i16::from(parser.read_be::<i8>()?),
        },
        OperandType::InvokeInterface => {
            let index = parser.read_be::<u16>()?;
            let count = parser.read_be::<u8>()?;
            parser.advance_by(1)?;
            Operand::Interface { index, count }
        }
        OperandType::InvokeDynamic => {
            let index = parser.read_be::<u16>()?;
            parser.advance_by(2)?;
            Operand::Constant(index)
        }
        OperandType::ArrayType => Operand::ArrayType(parser.read_be::<u8>()?),
        OperandType::MultiArray => Operand::MultiArray {
            index: parser.read_be::<u16>()?,
            dimensions: parser.read_be::<u8>()?,
        },
        OperandType::TableSwitch => {
            parser.align_from(0, 4)?;
            let default = branch_target(offset, parser.read_be()?)?;
            let low = parser.read_be::<i32>()?;
            let high = parser.read_be::<i32>()?;
            if high < low {
                return Err(malformed_error!("tableswitch at {} has high < low", offset));
            }
            let count = usize::try_from(i64::from(high) - i64::from(low) + 1)
                .map_err(|_| out_of_bounds_error!())?;
            if count * 4 > parser.remaining() {
                return Err(out_of_bounds_error!());
            }
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                targets.push(branch_target(offset, parser.read_be()?)?);
            }
            Operand::TableSwitch {
                default,
                low,
                targets,
            }
        }
        OperandType::LookupSwitch => {
            parser.align_from(0, 4)?;
            let default = branch_target(offset, parser.read_be()?)?;
            let count = parser.read_be::<i32>()?;
            let count = usize::try_from(count)
                .map_err(|_| malformed_error!("lookupswitch at {} has negative count", offset))?;
            if count * 8 > parser.remaining() {
                return Err(out_of_bounds_error!());
            }
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = parser.read_be::<i32>()?;
                pairs.push((key, branch_target(offset, parser.read_be()?)?));
            }
            Operand::LookupSwitch { default, pairs }
        }
        OperandType::Wide => return Err(malformed_error!("Nested wide prefix at {}", offset)),
    };

    Ok(Instruction {
        offset,
        size: u32::try_from(parser.pos() - start).map_err(|_| out_of_bounds_error!())?,
        opcode: byte,
        mnemonic: info.mnemonic,
        wide,
        operand,
    })
}

/// Decode a complete code array.
///
/// # Errors
///
/// Returns an error if any instruction fails to decode.
pub fn decode_stream(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut parser = Parser::new(code);
    let mut instructions = Vec::new();
    while parser.has_more_data() {
        instructions.push(decode_instruction(&mut parser)?);
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_and_invokes() -> Result<()> {
        // ldc #3; sipush -2; invokeinterface #7, 2; invokedynamic #9; areturn
        let code = [
            0x12, 0x03, 0x11, 0xFF, 0xFE, 0xB9, 0x00, 0x07, 0x02, 0x00, 0xBA, 0x00, 0x09, 0x00,
            0x00, 0xB0,
        ];
        let instructions = decode_stream(&code)?;
        assert_eq!(instructions.len(), 5);
        assert_eq!(instructions[0].operand, Operand::Constant(3));
        assert_eq!(instructions[1].operand, Operand::Immediate(-2));
        assert_eq!(
            instructions[2].operand,
            Operand::Interface { index: 7, count: 2 }
        );
        assert_eq!(instructions[3].operand, Operand::Constant(9));
        assert_eq!(instructions[3].size, 5);
        assert_eq!(instructions[4].offset, 15);
        Ok(())
    }

    #[test]
    fn wide_forms() -> Result<()> {
        // wide iload 300; wide iinc 300, -1000
        let code = [0xC4, 0x15, 0x01, 0x2C, 0xC4, 0x84, 0x01, 0x2C, 0xFC, 0x18];
        let instructions = decode_stream(&code)?;
        assert!(instructions[0].wide);
        assert_eq!(instructions[0].mnemonic, "iload");
        assert_eq!(instructions[0].operand, Operand::Local(300));
        assert_eq!(
            instructions[1].operand,
            Operand::Increment {
                local: 300,
                delta: -1000
            }
        );
        assert_eq!(instructions[1].to_string(), "    4: wide iinc 300, -1000");

        assert!(decode_stream(&[0xC4, 0xB1]).is_err());
        Ok(())
    }

    #[test]
    fn tableswitch_alignment() -> Result<()> {
        // nop; tableswitch (2 padding bytes) default +20, low 0, high 1, +16, +18
        let mut code = vec![0x00, 0xAA, 0x00, 0x00];
        for value in [20_i32, 0, 1, 16, 18] {
            code.extend_from_slice(&value.to_be_bytes());
        }
        code.push(0xB1);

        let instructions = decode_stream(&code)?;
        assert_eq!(instructions[1].size, 23);
        assert_eq!(
            instructions[1].operand,
            Operand::TableSwitch {
                default: 21,
                low: 0,
                targets: vec![17, 19],
            }
        );
        assert_eq!(instructions[2].offset, 24);
        Ok(())
    }

    #[test]
    fn lookupswitch_pairs() -> Result<()> {
        // lookupswitch (3 padding bytes) default +12, 1 pair (42 -> +8)
        let mut code = vec![0xAB, 0x00, 0x00, 0x00];
        for value in [12_i32, 1, 42, 8] {
            code.extend_from_slice(&value.to_be_bytes());
        }
        let instructions = decode_stream(&code)?;
        assert_eq!(
            instructions[0].operand,
            Operand::LookupSwitch {
                default: 12,
                pairs: vec![(42, 8)],
            }
        );
        Ok(())
    }

    #[test]
    fn invalid_and_truncated() {
        assert!(decode_stream(&[0xCB]).is_err());
        assert!(decode_stream(&[0x11, 0x00]).is_err());
        assert!(decode_stream(&[0xA7, 0xFF, 0x00]).is_err(), "branch before start");
    }
}

//! `StackMapTable` frames (JVMS §4.7.4).
//!
//! Frames are decoded into [`StackMapFrame`] so that code edits can adjust offsets, and encoded
//! back using the same frame kinds, so an untouched table round-trips byte for byte.

use crate::{
    classfile::{constpool::ConstantPool, descriptor::FieldType},
    file::{parser::Parser, writer::Writer},
    Result,
};

/// A verification type in a frame's locals or stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationType {
    /// `Top`
    Top,
    /// `Integer`
    Integer,
    /// `Float`
    Float,
    /// `Double` (occupies two slots, encoded once)
    Double,
    /// `Long` (occupies two slots, encoded once)
    Long,
    /// `Null`
    Null,
    /// `UninitializedThis`
    UninitializedThis,
    /// Object of the given `CONSTANT_Class`
    Object(u16),
    /// Result of the `new` instruction at the given code offset
    Uninitialized(u16),
}

impl VerificationType {
    /// The verification type of a value of the given field type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] if a class constant cannot be added.
    pub fn from_field_type(field: &FieldType, pool: &mut ConstantPool) -> Result<Self> {
        Ok(match field {
            FieldType::Boolean
            | FieldType::Byte
            | FieldType::Char
            | FieldType::Short
            | FieldType::Int => VerificationType::Integer,
            FieldType::Float => VerificationType::Float,
            FieldType::Long => VerificationType::Long,
            FieldType::Double => VerificationType::Double,
            FieldType::Object(_) | FieldType::Array(_) => {
                let name = field.class_constant_name().unwrap_or_default();
                VerificationType::Object(pool.class_index(&name)?)
            }
        })
    }

    fn parse(parser: &mut Parser) -> Result<Self> {
        let tag = parser.read_be::<u8>()?;
        Ok(match tag {
            0 => VerificationType::Top,
            1 => VerificationType::Integer,
            2 => VerificationType::Float,
            3 => VerificationType::Double,
            4 => VerificationType::Long,
            5 => VerificationType::Null,
            6 => VerificationType::UninitializedThis,
            7 => VerificationType::Object(parser.read_be()?),
            8 => VerificationType::Uninitialized(parser.read_be()?),
            _ => return Err(malformed_error!("Invalid verification type tag {}", tag)),
        })
    }

    fn write(self, writer: &mut Writer) {
        match self {
            VerificationType::Top => writer.write_be(0_u8),
            VerificationType::Integer => writer.write_be(1_u8),
            VerificationType::Float => writer.write_be(2_u8),
            VerificationType::Double => writer.write_be(3_u8),
            VerificationType::Long => writer.write_be(4_u8),
            VerificationType::Null => writer.write_be(5_u8),
            VerificationType::UninitializedThis => writer.write_be(6_u8),
            VerificationType::Object(index) => {
                writer.write_be(7_u8);
                writer.write_be(index);
            }
            VerificationType::Uninitialized(offset) => {
                writer.write_be(8_u8);
                writer.write_be(offset);
            }
        }
    }

    fn shift(&mut self, delta: u16) -> Result<()> {
        if let VerificationType::Uninitialized(offset) = self {
            *offset = offset
                .checked_add(delta)
                .ok_or_else(|| malformed_error!("Uninitialized offset overflows"))?;
        }
        Ok(())
    }
}

/// One stack map frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackMapFrame {
    /// `same_frame` (tags 0-63)
    Same {
        /// Offset delta, at most 63
        offset_delta: u16,
    },
    /// `same_locals_1_stack_item_frame` (tags 64-127)
    SameLocals1StackItem {
        /// Offset delta, at most 63
        offset_delta: u16,
        /// The single stack entry
        stack: VerificationType,
    },
    /// `same_locals_1_stack_item_frame_extended` (tag 247)
    SameLocals1StackItemExtended {
        /// Offset delta
        offset_delta: u16,
        /// The single stack entry
        stack: VerificationType,
    },
    /// `chop_frame` (tags 248-250)
    Chop {
        /// Number of removed locals (1-3)
        chopped: u8,
        /// Offset delta
        offset_delta: u16,
    },
    /// `same_frame_extended` (tag 251)
    SameExtended {
        /// Offset delta
        offset_delta: u16,
    },
    /// `append_frame` (tags 252-254)
    Append {
        /// Offset delta
        offset_delta: u16,
        /// Added locals (1-3)
        locals: Vec<VerificationType>,
    },
    /// `full_frame` (tag 255)
    Full {
        /// Offset delta
        offset_delta: u16,
        /// All locals
        locals: Vec<VerificationType>,
        /// All stack entries
        stack: Vec<VerificationType>,
    },
}

impl StackMapFrame {
    /// The frame's offset delta.
    #[must_use]
    pub fn offset_delta(&self) -> u16 {
        match self {
            StackMapFrame::Same { offset_delta }
            | StackMapFrame::SameLocals1StackItem { offset_delta, .. }
            | StackMapFrame::SameLocals1StackItemExtended { offset_delta, .. }
            | StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::SameExtended { offset_delta }
            | StackMapFrame::Append { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta,
        }
    }

    fn parse(parser: &mut Parser) -> Result<Self> {
        let tag = parser.read_be::<u8>()?;
        Ok(match tag {
            0..=63 => StackMapFrame::Same {
                offset_delta: u16::from(tag),
            },
            64..=127 => StackMapFrame::SameLocals1StackItem {
                offset_delta: u16::from(tag - 64),
                stack: VerificationType::parse(parser)?,
            },
            247 => StackMapFrame::SameLocals1StackItemExtended {
                offset_delta: parser.read_be()?,
                stack: VerificationType::parse(parser)?,
            },
            248..=250 => StackMapFrame::Chop {
                chopped: 251 - tag,
                offset_delta: parser.read_be()?,
            },
            251 => StackMapFrame::SameExtended {
                offset_delta: parser.read_be()?,
            },
            252..=254 => {
                let offset_delta = parser.read_be()?;
                let mut locals = Vec::with_capacity(usize::from(tag - 251));
                for _ in 0..tag - 251 {
                    locals.push(VerificationType::parse(parser)?);
                }
                StackMapFrame::Append {
                    offset_delta,
                    locals,
                }
            }
            255 => {
                let offset_delta = parser.read_be()?;
                let locals = parse_types(parser)?;
                let stack = parse_types(parser)?;
                StackMapFrame::Full {
                    offset_delta,
                    locals,
                    stack,
                }
            }
            _ => return Err(malformed_error!("Reserved stack map frame tag {}", tag)),
        })
    }

    fn write(&self, writer: &mut Writer) -> Result<()> {
        match self {
            StackMapFrame::Same { offset_delta } => {
                writer.write_be(compact_delta(*offset_delta)?);
            }
            StackMapFrame::SameLocals1StackItem {
                offset_delta,
                stack,
            } => {
                writer.write_be(64 + compact_delta(*offset_delta)?);
                stack.write(writer);
            }
            StackMapFrame::SameLocals1StackItemExtended {
                offset_delta,
                stack,
            } => {
                writer.write_be(247_u8);
                writer.write_be(*offset_delta);
                stack.write(writer);
            }
            StackMapFrame::Chop {
                chopped,
                offset_delta,
            } => {
                if !(1..=3).contains(chopped) {
                    return Err(malformed_error!("Chop frame removes {} locals", chopped));
                }
                writer.write_be(251 - chopped);
                writer.write_be(*offset_delta);
            }
            StackMapFrame::SameExtended { offset_delta } => {
                writer.write_be(251_u8);
                writer.write_be(*offset_delta);
            }
            StackMapFrame::Append {
                offset_delta,
                locals,
            } => {
                if !(1..=3).contains(&locals.len()) {
                    return Err(malformed_error!("Append frame adds {} locals", locals.len()));
                }
                writer.write_be(251 + locals.len() as u8);
                writer.write_be(*offset_delta);
                for local in locals {
                    local.write(writer);
                }
            }
            StackMapFrame::Full {
                offset_delta,
                locals,
                stack,
            } => {
                writer.write_be(255_u8);
                writer.write_be(*offset_delta);
                write_types(writer, locals, "frame locals")?;
                write_types(writer, stack, "frame stack entries")?;
            }
        }
        Ok(())
    }

    fn types_mut(&mut self) -> impl Iterator<Item = &mut VerificationType> {
        let (first, second): (&mut [VerificationType], &mut [VerificationType]) = match self {
            StackMapFrame::SameLocals1StackItem { stack, .. }
            | StackMapFrame::SameLocals1StackItemExtended { stack, .. } => {
                (std::slice::from_mut(stack), &mut [])
            }
            StackMapFrame::Append { locals, .. } => (locals.as_mut_slice(), &mut []),
            StackMapFrame::Full { locals, stack, .. } => {
                (locals.as_mut_slice(), stack.as_mut_slice())
            }
            _ => (&mut [], &mut []),
        };
        first.iter_mut().chain(second.iter_mut())
    }

    /// Add `delta` to the offset delta, switching to an extended form when the compact one
    /// can no longer hold it.
    fn add_delta(&mut self, delta: u16) -> Result<()> {
        let overflow = || malformed_error!("Stack map offset delta overflows");
        *self = match std::mem::replace(self, StackMapFrame::Same { offset_delta: 0 }) {
            StackMapFrame::Same { offset_delta } => {
                let offset_delta = offset_delta.checked_add(delta).ok_or_else(overflow)?;
                if offset_delta <= 63 {
                    StackMapFrame::Same { offset_delta }
                } else {
                    StackMapFrame::SameExtended { offset_delta }
                }
            }
            StackMapFrame::SameLocals1StackItem {
                offset_delta,
                stack,
            } => {
                let offset_delta = offset_delta.checked_add(delta).ok_or_else(overflow)?;
                if offset_delta <= 63 {
                    StackMapFrame::SameLocals1StackItem {
                        offset_delta,
                        stack,
                    }
                } else {
                    StackMapFrame::SameLocals1StackItemExtended {
                        offset_delta,
                        stack,
                    }
                }
            }
            mut frame => {
                match &mut frame {
                    StackMapFrame::SameLocals1StackItemExtended { offset_delta, .. }
                    | StackMapFrame::Chop { offset_delta, .. }
                    | StackMapFrame::SameExtended { offset_delta }
                    | StackMapFrame::Append { offset_delta, .. }
                    | StackMapFrame::Full { offset_delta, .. } => {
                        *offset_delta = offset_delta.checked_add(delta).ok_or_else(overflow)?;
                    }
                    StackMapFrame::Same { .. } | StackMapFrame::SameLocals1StackItem { .. } => {}
                }
                frame
            }
        };
        Ok(())
    }
}

fn compact_delta(offset_delta: u16) -> Result<u8> {
    u8::try_from(offset_delta)
        .ok()
        .filter(|delta| *delta <= 63)
        .ok_or_else(|| malformed_error!("Offset delta {} too large for compact frame", offset_delta))
}

fn parse_types(parser: &mut Parser) -> Result<Vec<VerificationType>> {
    let count = parser.read_be::<u16>()?;
    let mut types = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        types.push(VerificationType::parse(parser)?);
    }
    Ok(types)
}

fn write_types(writer: &mut Writer, types: &[VerificationType], what: &str) -> Result<()> {
    writer.write_len_u16(types.len(), what)?;
    for ty in types {
        ty.write(writer);
    }
    Ok(())
}

/// A decoded `StackMapTable` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackMapTable {
    /// Frames in code order
    pub frames: Vec<StackMapFrame>,
}

impl StackMapTable {
    /// Decode an attribute payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for reserved tags or trailing bytes and
    /// [`crate::Error::OutOfBounds`] for truncated data.
    pub fn parse(info: &[u8]) -> Result<Self> {
        let mut parser = Parser::new(info);
        let count = parser.read_be::<u16>()?;
        let mut frames = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            frames.push(StackMapFrame::parse(&mut parser)?);
        }
        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after stack map frames",
                parser.remaining()
            ));
        }
        Ok(StackMapTable { frames })
    }

    /// Encode into an attribute payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a frame cannot be represented.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        writer.write_len_u16(self.frames.len(), "stack map frames")?;
        for frame in &self.frames {
            frame.write(&mut writer)?;
        }
        Ok(writer.into_inner())
    }

    /// Adjust the table for `delta` bytes of code inserted at offset 0.
    ///
    /// Only the first frame stores an absolute position, so only its delta changes. Every
    /// `Uninitialized` entry refers to an absolute `new` offset and is shifted as well.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if an offset overflows.
    pub fn shift(&mut self, delta: u16) -> Result<()> {
        if let Some(first) = self.frames.first_mut() {
            first.add_delta(delta)?;
        }
        for frame in &mut self.frames {
            for ty in frame.types_mut() {
                ty.shift(delta)?;
            }
        }
        Ok(())
    }

    /// Absolute code offsets of all frames.
    #[must_use]
    pub fn offsets(&self) -> Vec<u32> {
        let mut offsets = Vec::with_capacity(self.frames.len());
        let mut previous: Option<u32> = None;
        for frame in &self.frames {
            let delta = u32::from(frame.offset_delta());
            let offset = previous.map_or(delta, |prev| prev + delta + 1);
            offsets.push(offset);
            previous = Some(offset);
        }
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_kinds() -> Result<()> {
        let table = StackMapTable {
            frames: vec![
                StackMapFrame::Same { offset_delta: 3 },
                StackMapFrame::SameLocals1StackItem {
                    offset_delta: 5,
                    stack: VerificationType::Object(7),
                },
                StackMapFrame::SameLocals1StackItemExtended {
                    offset_delta: 2,
                    stack: VerificationType::Integer,
                },
                StackMapFrame::Chop {
                    chopped: 2,
                    offset_delta: 10,
                },
                StackMapFrame::SameExtended { offset_delta: 1 },
                StackMapFrame::Append {
                    offset_delta: 4,
                    locals: vec![VerificationType::Long, VerificationType::Null],
                },
                StackMapFrame::Full {
                    offset_delta: 300,
                    locals: vec![VerificationType::UninitializedThis, VerificationType::Top],
                    stack: vec![VerificationType::Uninitialized(12)],
                },
            ],
        };
        let bytes = table.to_bytes()?;
        assert_eq!(StackMapTable::parse(&bytes)?, table);
        assert_eq!(table.offsets(), vec![3, 9, 12, 23, 25, 30, 331]);
        Ok(())
    }

    #[test]
    fn shift_promotes_compact_frames() -> Result<()> {
        let mut table = StackMapTable {
            frames: vec![
                StackMapFrame::SameLocals1StackItem {
                    offset_delta: 60,
                    stack: VerificationType::Uninitialized(4),
                },
                StackMapFrame::Same { offset_delta: 2 },
            ],
        };
        table.shift(8)?;
        assert_eq!(
            table.frames[0],
            StackMapFrame::SameLocals1StackItemExtended {
                offset_delta: 68,
                stack: VerificationType::Uninitialized(12),
            }
        );
        assert_eq!(table.frames[1], StackMapFrame::Same { offset_delta: 2 });

        let mut table = StackMapTable {
            frames: vec![StackMapFrame::Same { offset_delta: 63 }],
        };
        table.shift(8)?;
        assert_eq!(table.frames[0], StackMapFrame::SameExtended { offset_delta: 71 });
        assert_eq!(table.to_bytes()?, vec![0x00, 0x01, 251, 0x00, 71]);
        Ok(())
    }

    #[test]
    fn field_types_map_to_verification_types() -> Result<()> {
        let mut pool = ConstantPool::new();
        assert_eq!(
            VerificationType::from_field_type(&FieldType::Boolean, &mut pool)?,
            VerificationType::Integer
        );
        let array = FieldType::parse("[I")?;
        let VerificationType::Object(index) = VerificationType::from_field_type(&array, &mut pool)?
        else {
            panic!("arrays are objects");
        };
        assert_eq!(pool.class_name(index)?, "[I");
        Ok(())
    }

    #[test]
    fn reserved_tag_rejected() {
        assert!(StackMapTable::parse(&[0x00, 0x01, 200]).is_err());
    }
}

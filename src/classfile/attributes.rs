//! Class file attributes (JVMS §4.7).
//!
//! Attributes are kept in their raw form ([`Attribute`]) so that everything the rewriter does
//! not understand survives a round trip byte for byte. The `Code` attribute is decoded on
//! demand into [`CodeAttribute`], which also implements the one in-place code edit the engine
//! performs: prepending a prologue while shifting every offset-bearing table that follows it.

use crate::{
    bytecode::stackmap::StackMapTable,
    classfile::constpool::ConstantPool,
    file::{parser::Parser, writer::Writer},
    Error, Result,
};

/// Well-known attribute names.
#[allow(missing_docs)]
pub mod names {
    pub const CODE: &str = "Code";
    pub const STACK_MAP_TABLE: &str = "StackMapTable";
    pub const EXCEPTIONS: &str = "Exceptions";
    pub const SIGNATURE: &str = "Signature";
    pub const DEPRECATED: &str = "Deprecated";
    pub const SYNTHETIC: &str = "Synthetic";
    pub const METHOD_PARAMETERS: &str = "MethodParameters";
    pub const LINE_NUMBER_TABLE: &str = "LineNumberTable";
    pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
    pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
    pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
    pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
    pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
    pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str =
        "RuntimeInvisibleParameterAnnotations";
    pub const RUNTIME_VISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeVisibleTypeAnnotations";
    pub const RUNTIME_INVISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeInvisibleTypeAnnotations";
    pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
}

/// Maximum length of a method's code array.
pub const MAX_CODE_LENGTH: usize = 65535;

/// A raw attribute: name index plus uninterpreted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Index of the attribute name in the constant pool
    pub name_index: u16,
    /// Attribute payload (without the name and length header)
    pub info: Vec<u8>,
}

impl Attribute {
    /// Create an attribute, interning its name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] when the name cannot be added.
    pub fn new(pool: &mut ConstantPool, name: &str, info: Vec<u8>) -> Result<Attribute> {
        Ok(Attribute {
            name_index: pool.utf8_index(name)?,
            info,
        })
    }

    /// Resolve the attribute name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the name index is not a UTF-8 constant.
    pub fn name<'p>(&self, pool: &'p ConstantPool) -> Result<&'p str> {
        pool.utf8(self.name_index)
    }

    /// Returns true if the attribute has the given name. Unresolvable names never match.
    #[must_use]
    pub fn is(&self, pool: &ConstantPool, name: &str) -> bool {
        self.name(pool).is_ok_and(|n| n == name)
    }

    fn parse(parser: &mut Parser) -> Result<Attribute> {
        let name_index = parser.read_be::<u16>()?;
        let len = parser.read_be::<u32>()?;
        let len = usize::try_from(len).map_err(|_| out_of_bounds_error!())?;
        let info = parser.read_bytes(len)?.to_vec();
        Ok(Attribute { name_index, info })
    }

    fn write(&self, writer: &mut Writer) -> Result<()> {
        let len = u32::try_from(self.info.len())
            .map_err(|_| malformed_error!("Attribute payload exceeds u32 range"))?;
        writer.write_be(self.name_index);
        writer.write_be(len);
        writer.write_bytes(&self.info);
        Ok(())
    }
}

/// Parse a `u16`-counted attribute table.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] for truncated tables.
pub fn parse_attributes(parser: &mut Parser) -> Result<Vec<Attribute>> {
    let count = parser.read_be::<u16>()?;
    let mut attributes = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        attributes.push(Attribute::parse(parser)?);
    }
    Ok(attributes)
}

/// Write a `u16`-counted attribute table.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if there are too many attributes or one is oversized.
pub fn write_attributes(writer: &mut Writer, attributes: &[Attribute]) -> Result<()> {
    writer.write_len_u16(attributes.len(), "attributes")?;
    for attribute in attributes {
        attribute.write(writer)?;
    }
    Ok(())
}

/// Find the first attribute with the given name.
#[must_use]
pub fn find_attribute<'a>(
    attributes: &'a [Attribute],
    pool: &ConstantPool,
    name: &str,
) -> Option<&'a Attribute> {
    attributes.iter().find(|a| a.is(pool, name))
}

/// One entry of a method's exception table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    /// Start of the protected range (inclusive)
    pub start_pc: u16,
    /// End of the protected range (exclusive)
    pub end_pc: u16,
    /// Start of the handler
    pub handler_pc: u16,
    /// Class of the caught throwable, `0` catches everything
    pub catch_type: u16,
}

/// A decoded `Code` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// The bytecode
    pub code: Vec<u8>,
    /// Exception handlers in priority order
    pub exception_table: Vec<ExceptionTableEntry>,
    /// Nested attributes (`StackMapTable`, `LineNumberTable`, ...)
    pub attributes: Vec<Attribute>,
}

impl CodeAttribute {
    /// Decode the payload of a `Code` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] for truncated data and
    /// [`crate::Error::Malformed`] for trailing bytes.
    pub fn parse(info: &[u8]) -> Result<CodeAttribute> {
        let mut parser = Parser::new(info);
        let max_stack = parser.read_be::<u16>()?;
        let max_locals = parser.read_be::<u16>()?;
        let code_len = usize::try_from(parser.read_be::<u32>()?)
            .map_err(|_| out_of_bounds_error!())?;
        if code_len == 0 || code_len > MAX_CODE_LENGTH {
            return Err(malformed_error!("Invalid code length {}", code_len));
        }
        let code = parser.read_bytes(code_len)?.to_vec();

        let handler_count = parser.read_be::<u16>()?;
        let mut exception_table = Vec::with_capacity(usize::from(handler_count));
        for _ in 0..handler_count {
            exception_table.push(ExceptionTableEntry {
                start_pc: parser.read_be()?,
                end_pc: parser.read_be()?,
                handler_pc: parser.read_be()?,
                catch_type: parser.read_be()?,
            });
        }

        let attributes = parse_attributes(&mut parser)?;
        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after Code attribute",
                parser.remaining()
            ));
        }

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    /// Encode into a `Code` attribute payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CodeTooLarge`] for oversized code and
    /// [`crate::Error::Malformed`] for oversized tables.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.code.is_empty() || self.code.len() > MAX_CODE_LENGTH {
            return Err(Error::CodeTooLarge(format!("{} bytes", self.code.len())));
        }

        let mut writer = Writer::with_capacity(self.code.len() + 32);
        writer.write_be(self.max_stack);
        writer.write_be(self.max_locals);
        writer.write_be(self.code.len() as u32);
        writer.write_bytes(&self.code);
        writer.write_len_u16(self.exception_table.len(), "exception handlers")?;
        for entry in &self.exception_table {
            writer.write_be(entry.start_pc);
            writer.write_be(entry.end_pc);
            writer.write_be(entry.handler_pc);
            writer.write_be(entry.catch_type);
        }
        write_attributes(&mut writer, &self.attributes)?;
        Ok(writer.into_inner())
    }

    /// Prepend `prologue` to the code, shifting every code offset that follows.
    ///
    /// The prologue must be straight-line code that leaves the operand stack empty and its
    /// length must be a multiple of four so that `tableswitch`/`lookupswitch` padding in the
    /// existing code stays valid. Shifted structures: the exception table, `StackMapTable`
    /// (first frame delta and `Uninitialized` offsets), `LineNumberTable`,
    /// `LocalVariableTable` and `LocalVariableTypeTable`. Type annotations carry code offsets
    /// in a target-specific layout and are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CodeTooLarge`] if the result exceeds the code length limit and
    /// [`crate::Error::Malformed`] if a nested table cannot be decoded.
    pub fn prepend(&mut self, prologue: &[u8], pool: &ConstantPool) -> Result<()> {
        if prologue.len() % 4 != 0 {
            return Err(malformed_error!(
                "Prologue length {} breaks switch alignment",
                prologue.len()
            ));
        }
        if self.code.len() + prologue.len() > MAX_CODE_LENGTH {
            return Err(Error::CodeTooLarge(format!(
                "{} bytes after prologue",
                self.code.len() + prologue.len()
            )));
        }
        let shift = prologue.len() as u16;

        for entry in &mut self.exception_table {
            entry.start_pc += shift;
            entry.end_pc += shift;
            entry.handler_pc += shift;
        }

        let mut kept = Vec::with_capacity(self.attributes.len());
        for mut attribute in std::mem::take(&mut self.attributes) {
            let name = attribute.name(pool)?;
            match name {
                names::STACK_MAP_TABLE => {
                    let mut table = StackMapTable::parse(&attribute.info)?;
                    table.shift(shift)?;
                    attribute.info = table.to_bytes()?;
                }
                names::LINE_NUMBER_TABLE => {
                    attribute.info = shift_table(&attribute.info, 4, shift)?;
                }
                names::LOCAL_VARIABLE_TABLE | names::LOCAL_VARIABLE_TYPE_TABLE => {
                    attribute.info = shift_table(&attribute.info, 10, shift)?;
                }
                names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS
                | names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS => {
                    log::debug!("Dropping {name} from shifted code");
                    continue;
                }
                _ => {}
            }
            kept.push(attribute);
        }
        self.attributes = kept;

        let mut code = Vec::with_capacity(prologue.len() + self.code.len());
        code.extend_from_slice(prologue);
        code.extend_from_slice(&self.code);
        self.code = code;
        Ok(())
    }
}

/// Shift the leading `start_pc` of every entry of a `u16`-counted table of fixed-size entries.
fn shift_table(info: &[u8], entry_len: usize, shift: u16) -> Result<Vec<u8>> {
    let mut parser = Parser::new(info);
    let count = usize::from(parser.read_be::<u16>()?);
    if info.len() != 2 + count * entry_len {
        return Err(malformed_error!(
            "Table of {} entries has {} bytes",
            count,
            info.len()
        ));
    }

    let mut writer = Writer::with_capacity(info.len());
    writer.write_be(count as u16);
    for _ in 0..count {
        let start_pc = parser.read_be::<u16>()?;
        let start_pc = start_pc
            .checked_add(shift)
            .ok_or_else(|| malformed_error!("Shifted start_pc overflows"))?;
        writer.write_be(start_pc);
        writer.write_bytes(parser.read_bytes(entry_len - 2)?);
    }
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_code(pool: &mut ConstantPool) -> Result<CodeAttribute> {
        let mut lines = Writer::new();
        lines.write_be(2_u16);
        lines.write_be(0_u16);
        lines.write_be(10_u16);
        lines.write_be(6_u16);
        lines.write_be(11_u16);

        // iconst_0; ifeq +5; nop; nop; return  with a same_frame at offset 6
        Ok(CodeAttribute {
            max_stack: 1,
            max_locals: 0,
            code: vec![0x03, 0x99, 0x00, 0x05, 0x00, 0x00, 0xB1],
            exception_table: vec![ExceptionTableEntry {
                start_pc: 0,
                end_pc: 4,
                handler_pc: 6,
                catch_type: 0,
            }],
            attributes: vec![
                Attribute::new(pool, names::STACK_MAP_TABLE, vec![0x00, 0x01, 6])?,
                Attribute::new(pool, names::LINE_NUMBER_TABLE, lines.into_inner())?,
                Attribute::new(pool, names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS, vec![0, 0])?,
            ],
        })
    }

    #[test]
    fn code_roundtrip() -> Result<()> {
        let mut pool = ConstantPool::new();
        let code = sample_code(&mut pool)?;
        assert_eq!(CodeAttribute::parse(&code.to_bytes()?)?, code);
        Ok(())
    }

    #[test]
    fn prepend_shifts_offsets() -> Result<()> {
        let mut pool = ConstantPool::new();
        let mut code = sample_code(&mut pool)?;
        code.prepend(&[0x00; 8], &pool)?;

        assert_eq!(code.code.len(), 15);
        assert_eq!(&code.code[8..], &[0x03, 0x99, 0x00, 0x05, 0x00, 0x00, 0xB1]);
        assert_eq!(
            code.exception_table[0],
            ExceptionTableEntry {
                start_pc: 8,
                end_pc: 12,
                handler_pc: 14,
                catch_type: 0,
            }
        );

        assert_eq!(code.attributes.len(), 2, "type annotations are dropped");
        assert_eq!(code.attributes[0].info, vec![0x00, 0x01, 14]);
        assert_eq!(
            code.attributes[1].info,
            vec![0x00, 0x02, 0x00, 8, 0x00, 10, 0x00, 14, 0x00, 11]
        );
        Ok(())
    }

    #[test]
    fn prepend_rejects_misaligned_prologue() -> Result<()> {
        let mut pool = ConstantPool::new();
        let mut code = sample_code(&mut pool)?;
        assert!(code.prepend(&[0x00; 6], &pool).is_err());
        assert_eq!(code.code.len(), 7, "code is untouched on failure");
        Ok(())
    }

    #[test]
    fn trailing_bytes_are_malformed() -> Result<()> {
        let mut pool = ConstantPool::new();
        let mut bytes = sample_code(&mut pool)?.to_bytes()?;
        bytes.push(0);
        assert!(matches!(
            CodeAttribute::parse(&bytes),
            Err(Error::Malformed { .. })
        ));
        Ok(())
    }
}

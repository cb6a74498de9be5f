//! Annotation attributes (JVMS §4.7.16).
//!
//! The rewriter only needs the *type* of each annotation to detect the task marker, so element
//! values are validated and skipped rather than decoded.

use crate::{
    classfile::{constpool::ConstantPool, descriptor::FieldType},
    file::parser::Parser,
    Result,
};

/// Decode the annotation types of a `Runtime(In)VisibleAnnotations` payload.
///
/// Types are returned in binary notation (`io.probeweave.annotations.Task`).
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] for truncated payloads and
/// [`crate::Error::Malformed`] for invalid element tags, unresolvable type indices or
/// trailing bytes.
pub fn annotation_types(info: &[u8], pool: &ConstantPool) -> Result<Vec<String>> {
    let mut parser = Parser::new(info);
    let count = parser.read_be::<u16>()?;
    let mut types = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        types.push(read_annotation(&mut parser, pool)?);
    }
    if parser.has_more_data() {
        return Err(malformed_error!(
            "{} trailing bytes after annotations",
            parser.remaining()
        ));
    }
    Ok(types)
}

fn read_annotation(parser: &mut Parser, pool: &ConstantPool) -> Result<String> {
    let type_index = parser.read_be::<u16>()?;
    let descriptor = pool.utf8(type_index)?;
    let name = match FieldType::parse(descriptor)? {
        FieldType::Object(name) => name.replace('/', "."),
        other => {
            return Err(malformed_error!(
                "Annotation type {} is not a class",
                other
            ))
        }
    };

    let pairs = parser.read_be::<u16>()?;
    for _ in 0..pairs {
        parser.advance_by(2)?;
        skip_element_value(parser, pool)?;
    }
    Ok(name)
}

fn skip_element_value(parser: &mut Parser, pool: &ConstantPool) -> Result<()> {
    let tag = parser.read_be::<u8>()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => parser.advance_by(2),
        b'e' => parser.advance_by(4),
        b'@' => read_annotation(parser, pool).map(|_| ()),
        b'[' => {
            let count = parser.read_be::<u16>()?;
            for _ in 0..count {
                skip_element_value(parser, pool)?;
            }
            Ok(())
        }
        _ => Err(malformed_error!("Invalid element value tag 0x{:02X}", tag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::writer::Writer;

    #[test]
    fn types_with_nested_values() -> Result<()> {
        let mut pool = ConstantPool::new();
        let task = pool.utf8_index("Lio/probeweave/annotations/Task;")?;
        let other = pool.utf8_index("Lcom/acme/Retry;")?;
        let element = pool.utf8_index("value")?;

        let mut writer = Writer::new();
        writer.write_be(2_u16);
        // @Retry(value = {1, @Task})
        writer.write_be(other);
        writer.write_be(1_u16);
        writer.write_be(element);
        writer.write_be(b'[');
        writer.write_be(2_u16);
        writer.write_be(b'I');
        writer.write_be(1_u16);
        writer.write_be(b'@');
        writer.write_be(task);
        writer.write_be(0_u16);
        // @Task
        writer.write_be(task);
        writer.write_be(0_u16);

        let types = annotation_types(writer.as_slice(), &pool)?;
        assert_eq!(types, vec!["com.acme.Retry", "io.probeweave.annotations.Task"]);
        Ok(())
    }

    #[test]
    fn invalid_tag_rejected() -> Result<()> {
        let mut pool = ConstantPool::new();
        let task = pool.utf8_index("Lio/probeweave/annotations/Task;")?;
        let element = pool.utf8_index("value")?;

        let mut writer = Writer::new();
        writer.write_be(1_u16);
        writer.write_be(task);
        writer.write_be(1_u16);
        writer.write_be(element);
        writer.write_be(b'X');
        assert!(annotation_types(writer.as_slice(), &pool).is_err());
        Ok(())
    }
}

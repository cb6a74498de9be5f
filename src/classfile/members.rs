//! Fields and methods (JVMS §4.5, §4.6).

use crate::{
    classfile::{
        access::{FieldAccessFlags, MethodAccessFlags},
        annotations::annotation_types,
        attributes::{find_attribute, names, parse_attributes, write_attributes, Attribute, CodeAttribute},
        constpool::ConstantPool,
    },
    file::{parser::Parser, writer::Writer},
    Result,
};

/// A field declared by a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Access and property flags
    pub access_flags: FieldAccessFlags,
    /// Index of the field name
    pub name_index: u16,
    /// Index of the field descriptor
    pub descriptor_index: u16,
    /// Field attributes
    pub attributes: Vec<Attribute>,
}

impl FieldInfo {
    pub(crate) fn parse(parser: &mut Parser) -> Result<FieldInfo> {
        Ok(FieldInfo {
            access_flags: FieldAccessFlags::from_bits_retain(parser.read_be()?),
            name_index: parser.read_be()?,
            descriptor_index: parser.read_be()?,
            attributes: parse_attributes(parser)?,
        })
    }

    pub(crate) fn write(&self, writer: &mut Writer) -> Result<()> {
        writer.write_be(self.access_flags.bits());
        writer.write_be(self.name_index);
        writer.write_be(self.descriptor_index);
        write_attributes(writer, &self.attributes)
    }

    /// Resolve the field name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the name index is invalid.
    pub fn name<'p>(&self, pool: &'p ConstantPool) -> Result<&'p str> {
        pool.utf8(self.name_index)
    }

    /// Resolve the field descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor index is invalid.
    pub fn descriptor<'p>(&self, pool: &'p ConstantPool) -> Result<&'p str> {
        pool.utf8(self.descriptor_index)
    }
}

/// A method declared by a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Access and property flags
    pub access_flags: MethodAccessFlags,
    /// Index of the method name
    pub name_index: u16,
    /// Index of the method descriptor
    pub descriptor_index: u16,
    /// Method attributes, including `Code`
    pub attributes: Vec<Attribute>,
}

impl MethodInfo {
    pub(crate) fn parse(parser: &mut Parser) -> Result<MethodInfo> {
        Ok(MethodInfo {
            access_flags: MethodAccessFlags::from_bits_retain(parser.read_be()?),
            name_index: parser.read_be()?,
            descriptor_index: parser.read_be()?,
            attributes: parse_attributes(parser)?,
        })
    }

    pub(crate) fn write(&self, writer: &mut Writer) -> Result<()> {
        writer.write_be(self.access_flags.bits());
        writer.write_be(self.name_index);
        writer.write_be(self.descriptor_index);
        write_attributes(writer, &self.attributes)
    }

    /// Resolve the method name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the name index is invalid.
    pub fn name<'p>(&self, pool: &'p ConstantPool) -> Result<&'p str> {
        pool.utf8(self.name_index)
    }

    /// Resolve the method descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor index is invalid.
    pub fn descriptor<'p>(&self, pool: &'p ConstantPool) -> Result<&'p str> {
        pool.utf8(self.descriptor_index)
    }

    /// Returns true for `<init>` and `<clinit>`.
    #[must_use]
    pub fn is_initializer(&self, pool: &ConstantPool) -> bool {
        self.name(pool).is_ok_and(|name| name.starts_with('<'))
    }

    /// Decode the `Code` attribute, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute exists but cannot be decoded.
    pub fn code(&self, pool: &ConstantPool) -> Result<Option<CodeAttribute>> {
        find_attribute(&self.attributes, pool, names::CODE)
            .map(|attribute| CodeAttribute::parse(&attribute.info))
            .transpose()
    }

    /// Replace (or add) the `Code` attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be encoded or the attribute name cannot be interned.
    pub fn set_code(&mut self, pool: &mut ConstantPool, code: &CodeAttribute) -> Result<()> {
        let info = code.to_bytes()?;
        match self.attributes.iter_mut().find(|a| a.is(pool, names::CODE)) {
            Some(attribute) => attribute.info = info,
            None => self.attributes.push(Attribute::new(pool, names::CODE, info)?),
        }
        Ok(())
    }

    /// Types of the runtime-visible annotations on this method, in binary notation.
    ///
    /// # Errors
    ///
    /// Returns an error if the annotation attribute is malformed.
    pub fn visible_annotations(&self, pool: &ConstantPool) -> Result<Vec<String>> {
        match find_attribute(&self.attributes, pool, names::RUNTIME_VISIBLE_ANNOTATIONS) {
            Some(attribute) => annotation_types(&attribute.info, pool),
            None => Ok(Vec::new()),
        }
    }
}

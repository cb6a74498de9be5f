//! In-memory model of a JVM class file.
//!
//! [`ClassFile::parse`] decodes a complete class file into an owned model and
//! [`ClassFile::to_bytes`] serializes it back. Parsing is lossless for everything the model
//! does not interpret. Unknown attributes are carried as raw payloads, constant pool order is
//! preserved, UTF-8 constants without an exact `String` form stay as raw bytes and unknown flag
//! bits are retained, so an unmodified model serializes to the exact input bytes.
//!
//! # Architecture
//!
//! - [`constpool`] - constant pool with find-or-add interning
//! - [`access`] - access flag bitflags
//! - [`descriptor`] - field and method descriptor types
//! - [`attributes`] - raw attributes and the decoded `Code` attribute
//! - [`annotations`] - annotation type extraction
//! - [`members`] - fields and methods
//! - [`builders`] - fluent builders for adding members or assembling whole classes
//!
//! # Examples
//!
//! ```rust
//! use probeweave::classfile::{ClassFile, ClassFileBuilder, MethodBuilder};
//!
//! let class = ClassFileBuilder::new("com/acme/Job")
//!     .method(MethodBuilder::new("run", "()V").body(0, 1, vec![0xB1]))
//!     .build()?;
//!
//! let bytes = class.to_bytes()?;
//! let parsed = ClassFile::parse(&bytes)?;
//! assert_eq!(parsed.name()?, "com/acme/Job");
//! assert_eq!(parsed.to_bytes()?, bytes);
//! # Ok::<(), probeweave::Error>(())
//! ```

pub mod access;
pub mod annotations;
pub mod attributes;
pub mod builders;
pub mod constpool;
pub mod descriptor;
pub mod members;
pub mod mutf8;

pub use access::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
pub use attributes::{Attribute, CodeAttribute, ExceptionTableEntry};
pub use builders::{ClassFileBuilder, FieldBuilder, MethodBuilder};
pub use constpool::{Constant, ConstantPool, MemberRef};
pub use descriptor::{FieldType, MethodType};
pub use members::{FieldInfo, MethodInfo};

use crate::{
    classfile::attributes::{parse_attributes, write_attributes},
    file::{parser::Parser, writer::Writer},
    Error, Result,
};

/// The class file magic number.
pub const MAGIC: u32 = 0xCAFE_BABE;

/// First major version that requires `StackMapTable` frames (Java 6).
pub const STACK_MAP_MAJOR_VERSION: u16 = 50;

/// A parsed class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    /// Minor version
    pub minor_version: u16,
    /// Major version
    pub major_version: u16,
    /// The constant pool
    pub constant_pool: ConstantPool,
    /// Class access and property flags
    pub access_flags: ClassAccessFlags,
    /// `CONSTANT_Class` index of this class
    pub this_class: u16,
    /// `CONSTANT_Class` index of the superclass, `0` for `java/lang/Object`
    pub super_class: u16,
    /// `CONSTANT_Class` indices of the direct superinterfaces
    pub interfaces: Vec<u16>,
    /// Declared fields
    pub fields: Vec<FieldInfo>,
    /// Declared methods
    pub methods: Vec<MethodInfo>,
    /// Class attributes
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Parse a complete class file.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Empty`] for empty input
    /// - [`crate::Error::NotSupported`] if the magic number does not match
    /// - [`crate::Error::OutOfBounds`] for truncated input
    /// - [`crate::Error::Malformed`] for structural errors or trailing bytes
    pub fn parse(data: &[u8]) -> Result<ClassFile> {
        if data.is_empty() {
            return Err(Error::Empty);
        }

        let mut parser = Parser::new(data);
        if parser.read_be::<u32>().ok() != Some(MAGIC) {
            return Err(Error::NotSupported);
        }

        let minor_version = parser.read_be::<u16>()?;
        let major_version = parser.read_be::<u16>()?;
        let constant_pool = ConstantPool::parse(&mut parser)?;
        let access_flags = ClassAccessFlags::from_bits_retain(parser.read_be()?);
        let this_class = parser.read_be::<u16>()?;
        let super_class = parser.read_be::<u16>()?;
        let interfaces = parser.read_u16_table()?;

        let field_count = parser.read_be::<u16>()?;
        let mut fields = Vec::with_capacity(usize::from(field_count));
        for _ in 0..field_count {
            fields.push(FieldInfo::parse(&mut parser)?);
        }

        let method_count = parser.read_be::<u16>()?;
        let mut methods = Vec::with_capacity(usize::from(method_count));
        for _ in 0..method_count {
            methods.push(MethodInfo::parse(&mut parser)?);
        }

        let attributes = parse_attributes(&mut parser)?;
        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after class file",
                parser.remaining()
            ));
        }

        let class = ClassFile {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        class.name()?;
        Ok(class)
    }

    /// Serialize the class file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a table exceeds its `u16` count (for example more
    /// than 65535 fields) or an attribute payload is oversized.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::with_capacity(4096);
        writer.write_be(MAGIC);
        writer.write_be(self.minor_version);
        writer.write_be(self.major_version);
        self.constant_pool.write(&mut writer)?;
        writer.write_be(self.access_flags.bits());
        writer.write_be(self.this_class);
        writer.write_be(self.super_class);
        writer.write_u16_table(&self.interfaces, "interfaces")?;

        writer.write_len_u16(self.fields.len(), "fields")?;
        for field in &self.fields {
            field.write(&mut writer)?;
        }

        writer.write_len_u16(self.methods.len(), "methods")?;
        for method in &self.methods {
            method.write(&mut writer)?;
        }

        write_attributes(&mut writer, &self.attributes)?;
        Ok(writer.into_inner())
    }

    /// Internal name of this class (`com/acme/Job`).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `this_class` is not a class constant.
    pub fn name(&self) -> Result<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Binary name of this class (`com.acme.Job`).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `this_class` is not a class constant.
    pub fn binary_name(&self) -> Result<String> {
        Ok(self.name()?.replace('/', "."))
    }

    /// Internal name of the superclass, `None` for `java/lang/Object` and modules.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `super_class` is not a class constant.
    pub fn super_name(&self) -> Result<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.class_name(self.super_class).map(Some)
    }

    /// Returns true if the class file declares an interface.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    /// Returns true if methods of this class file must carry `StackMapTable` frames.
    #[must_use]
    pub fn requires_stack_maps(&self) -> bool {
        self.major_version >= STACK_MAP_MAJOR_VERSION
    }

    /// Index of the first field with the given name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.name(&self.constant_pool).is_ok_and(|n| n == name))
    }

    /// Index of the method with the given name and descriptor.
    #[must_use]
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<usize> {
        self.methods.iter().position(|method| {
            method.name(&self.constant_pool).is_ok_and(|n| n == name)
                && method
                    .descriptor(&self.constant_pool)
                    .is_ok_and(|d| d == descriptor)
        })
    }
}

//! The class file constant pool (JVMS §4.4).
//!
//! The pool is stored as a dense vector indexed exactly like the on-disk table: slot `0` is
//! unused, and every `CONSTANT_Long` / `CONSTANT_Double` entry is followed by an
//! [`Constant::Unusable`] placeholder. This keeps every existing index in the class file valid
//! while new entries are appended.
//!
//! # Find-or-add
//!
//! Rewriting needs symbolic references (classes, strings, field and method references) that
//! may or may not already be present. The `*_index` helpers return the index of an existing
//! structurally identical entry or append a new one, so repeated rewrites of the same unit do
//! not grow the pool without bound.
//!
//! # Examples
//!
//! ```rust
//! use probeweave::classfile::ConstantPool;
//!
//! let mut pool = ConstantPool::new();
//! let owner = pool.class_index("com/acme/Pipeline")?;
//! let again = pool.class_index("com/acme/Pipeline")?;
//! assert_eq!(owner, again);
//! assert_eq!(pool.class_name(owner)?, "com/acme/Pipeline");
//! # Ok::<(), probeweave::Error>(())
//! ```

use std::{collections::HashMap, fmt};

use crate::{
    classfile::mutf8,
    file::{parser::Parser, writer::Writer},
    Error, Result,
};

/// Constant pool entry tags.
#[allow(missing_docs)]
pub mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const INTERFACE_METHODREF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

/// One constant pool entry.
///
/// Floating point constants keep their raw bit patterns so that pools compare and round-trip
/// exactly, NaN payloads included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Slot 0 and the second slot of long/double entries.
    Unusable,
    /// `CONSTANT_Utf8`
    Utf8(String),
    /// `CONSTANT_Utf8` whose modified UTF-8 has no exact `String` form, kept as the raw bytes.
    ///
    /// Java string literals may hold lone surrogates. Such entries are never names or
    /// descriptors, so they only need to survive serialization.
    Utf8Raw(Vec<u8>),
    /// `CONSTANT_Integer`
    Integer(i32),
    /// `CONSTANT_Float` as raw bits
    Float(u32),
    /// `CONSTANT_Long`
    Long(i64),
    /// `CONSTANT_Double` as raw bits
    Double(u64),
    /// `CONSTANT_Class` referencing a UTF-8 internal name
    Class {
        /// Index of the internal name
        name_index: u16,
    },
    /// `CONSTANT_String` referencing a UTF-8 value
    String {
        /// Index of the value
        string_index: u16,
    },
    /// `CONSTANT_Fieldref`
    FieldRef {
        /// Index of the owning class
        class_index: u16,
        /// Index of the name and type
        name_and_type_index: u16,
    },
    /// `CONSTANT_Methodref`
    MethodRef {
        /// Index of the owning class
        class_index: u16,
        /// Index of the name and type
        name_and_type_index: u16,
    },
    /// `CONSTANT_InterfaceMethodref`
    InterfaceMethodRef {
        /// Index of the owning interface
        class_index: u16,
        /// Index of the name and type
        name_and_type_index: u16,
    },
    /// `CONSTANT_NameAndType`
    NameAndType {
        /// Index of the member name
        name_index: u16,
        /// Index of the descriptor
        descriptor_index: u16,
    },
    /// `CONSTANT_MethodHandle`
    MethodHandle {
        /// Reference kind (1-9)
        reference_kind: u8,
        /// Index of the referenced member
        reference_index: u16,
    },
    /// `CONSTANT_MethodType`
    MethodType {
        /// Index of the method descriptor
        descriptor_index: u16,
    },
    /// `CONSTANT_Dynamic`
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method_attr_index: u16,
        /// Index of the name and type
        name_and_type_index: u16,
    },
    /// `CONSTANT_InvokeDynamic`
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method_attr_index: u16,
        /// Index of the name and type
        name_and_type_index: u16,
    },
    /// `CONSTANT_Module`
    Module {
        /// Index of the module name
        name_index: u16,
    },
    /// `CONSTANT_Package`
    Package {
        /// Index of the package name
        name_index: u16,
    },
}

impl Constant {
    /// Returns true for entries that occupy two pool slots.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    fn parse(parser: &mut Parser) -> Result<Constant> {
        let tag = parser.read_be::<u8>()?;
        let constant = match tag {
            tag::UTF8 => {
                let len = parser.read_be::<u16>()?;
                let bytes = parser.read_bytes(usize::from(len))?;
                match mutf8::decode_exact(bytes)? {
                    Some(text) => Constant::Utf8(text),
                    None => Constant::Utf8Raw(bytes.to_vec()),
                }
            }
            tag::INTEGER => Constant::Integer(parser.read_be::<i32>()?),
            tag::FLOAT => Constant::Float(parser.read_be::<u32>()?),
            tag::LONG => Constant::Long(parser.read_be::<i64>()?),
            tag::DOUBLE => Constant::Double(parser.read_be::<u64>()?),
            tag::CLASS => Constant::Class {
                name_index: parser.read_be()?,
            },
            tag::STRING => Constant::String {
                string_index: parser.read_be()?,
            },
            tag::FIELDREF => Constant::FieldRef {
                class_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            tag::METHODREF => Constant::MethodRef {
                class_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            tag::INTERFACE_METHODREF => Constant::InterfaceMethodRef {
                class_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            tag::NAME_AND_TYPE => Constant::NameAndType {
                name_index: parser.read_be()?,
                descriptor_index: parser.read_be()?,
            },
            tag::METHOD_HANDLE => Constant::MethodHandle {
                reference_kind: parser.read_be()?,
                reference_index: parser.read_be()?,
            },
            tag::METHOD_TYPE => Constant::MethodType {
                descriptor_index: parser.read_be()?,
            },
            tag::DYNAMIC => Constant::Dynamic {
                bootstrap_method_attr_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            tag::INVOKE_DYNAMIC => Constant::InvokeDynamic {
                bootstrap_method_attr_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            tag::MODULE => Constant::Module {
                name_index: parser.read_be()?,
            },
            tag::PACKAGE => Constant::Package {
                name_index: parser.read_be()?,
            },
            other => {
                return Err(malformed_error!(
                    "Unknown constant pool tag {} at offset {}",
                    other,
                    parser.pos() - 1
                ))
            }
        };
        Ok(constant)
    }

    fn write(&self, writer: &mut Writer) -> Result<()> {
        match self {
            Constant::Unusable => {}
            Constant::Utf8(text) => {
                let bytes = mutf8::encode(text);
                writer.write_be(tag::UTF8);
                writer.write_len_u16(bytes.len(), "bytes in a UTF-8 constant")?;
                writer.write_bytes(&bytes);
            }
            Constant::Utf8Raw(bytes) => {
                writer.write_be(tag::UTF8);
                writer.write_len_u16(bytes.len(), "bytes in a UTF-8 constant")?;
                writer.write_bytes(bytes);
            }
            Constant::Integer(value) => {
                writer.write_be(tag::INTEGER);
                writer.write_be(*value);
            }
            Constant::Float(bits) => {
                writer.write_be(tag::FLOAT);
                writer.write_be(*bits);
            }
            Constant::Long(value) => {
                writer.write_be(tag::LONG);
                writer.write_be(*value);
            }
            Constant::Double(bits) => {
                writer.write_be(tag::DOUBLE);
                writer.write_be(*bits);
            }
            Constant::Class { name_index } => {
                writer.write_be(tag::CLASS);
                writer.write_be(*name_index);
            }
            Constant::String { string_index } => {
                writer.write_be(tag::STRING);
                writer.write_be(*string_index);
            }
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            } => {
                writer.write_be(tag::FIELDREF);
                writer.write_be(*class_index);
                writer.write_be(*name_and_type_index);
            }
            Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => {
                writer.write_be(tag::METHODREF);
                writer.write_be(*class_index);
                writer.write_be(*name_and_type_index);
            }
            Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => {
                writer.write_be(tag::INTERFACE_METHODREF);
                writer.write_be(*class_index);
                writer.write_be(*name_and_type_index);
            }
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => {
                writer.write_be(tag::NAME_AND_TYPE);
                writer.write_be(*name_index);
                writer.write_be(*descriptor_index);
            }
            Constant::MethodHandle {
                reference_kind,
                reference_index,
            } => {
                writer.write_be(tag::METHOD_HANDLE);
                writer.write_be(*reference_kind);
                writer.write_be(*reference_index);
            }
            Constant::MethodType { descriptor_index } => {
                writer.write_be(tag::METHOD_TYPE);
                writer.write_be(*descriptor_index);
            }
            Constant::Dynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                writer.write_be(tag::DYNAMIC);
                writer.write_be(*bootstrap_method_attr_index);
                writer.write_be(*name_and_type_index);
            }
            Constant::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                writer.write_be(tag::INVOKE_DYNAMIC);
                writer.write_be(*bootstrap_method_attr_index);
                writer.write_be(*name_and_type_index);
            }
            Constant::Module { name_index } => {
                writer.write_be(tag::MODULE);
                writer.write_be(*name_index);
            }
            Constant::Package { name_index } => {
                writer.write_be(tag::PACKAGE);
                writer.write_be(*name_index);
            }
        }
        Ok(())
    }
}

/// A resolved member reference: owner, name and descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef<'a> {
    /// Internal name of the owning class
    pub owner: &'a str,
    /// Member name
    pub name: &'a str,
    /// Field or method descriptor
    pub descriptor: &'a str,
}

impl fmt::Display for MemberRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.descriptor)
    }
}

/// The constant pool of one class file.
///
/// Besides the slot vector the pool keeps a reverse index from constant to its first slot,
/// which makes find-or-add constant time on large pools.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    lookup: HashMap<Constant, u16>,
}

impl PartialEq for ConstantPool {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for ConstantPool {}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    /// Create an empty pool holding only the reserved slot 0.
    #[must_use]
    pub fn new() -> Self {
        ConstantPool {
            entries: vec![Constant::Unusable],
            lookup: HashMap::new(),
        }
    }

    /// Parse a pool: a `u16` count followed by `count - 1` slots.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for unknown tags, a zero count or a wide entry in
    /// the last slot, and [`crate::Error::OutOfBounds`] for truncated data.
    pub fn parse(parser: &mut Parser) -> Result<ConstantPool> {
        let count = usize::from(parser.read_be::<u16>()?);
        if count == 0 {
            return Err(malformed_error!("Constant pool count must be at least 1"));
        }

        let mut entries = Vec::with_capacity(count);
        let mut lookup = HashMap::with_capacity(count);
        entries.push(Constant::Unusable);
        while entries.len() < count {
            let constant = Constant::parse(parser)?;
            let wide = constant.is_wide();
            if let Ok(index) = u16::try_from(entries.len()) {
                lookup.entry(constant.clone()).or_insert(index);
            }
            entries.push(constant);
            if wide {
                if entries.len() >= count {
                    return Err(malformed_error!(
                        "Wide constant occupies the last pool slot {}",
                        entries.len() - 1
                    ));
                }
                entries.push(Constant::Unusable);
            }
        }

        Ok(ConstantPool { entries, lookup })
    }

    /// Serialize the pool including its count.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] if the pool has grown past the limit
    /// and [`crate::Error::Malformed`] for oversized UTF-8 entries.
    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        let count = u16::try_from(self.entries.len()).map_err(|_| Error::ConstantPoolOverflow)?;
        writer.write_be(count);
        for constant in &self.entries[1..] {
            constant.write(writer)?;
        }
        Ok(())
    }

    /// Number of slots including slot 0 (the on-disk `constant_pool_count`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the pool holds no entries besides slot 0.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Iterate over `(index, constant)` pairs, skipping unusable slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .filter_map(|(i, c)| u16::try_from(i).ok().map(|i| (i, c)))
    }

    /// Look up an entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for index 0, unusable slots and indices past the end.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(usize::from(index)) {
            Some(Constant::Unusable) | None => Err(malformed_error!(
                "Invalid constant pool index {} (pool size {})",
                index,
                self.entries.len()
            )),
            Some(constant) => Ok(constant),
        }
    }

    /// Resolve a `CONSTANT_Utf8` entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the index does not refer to a UTF-8 entry or the
    /// entry has no exact text form.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(text) => Ok(text),
            other => Err(malformed_error!(
                "Constant {} is not UTF-8: {:?}",
                index,
                other
            )),
        }
    }

    /// Resolve a `CONSTANT_Class` entry to its internal name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the index does not refer to a class entry.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            other => Err(malformed_error!(
                "Constant {} is not a class: {:?}",
                index,
                other
            )),
        }
    }

    /// Resolve a `CONSTANT_String` entry to its value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the index does not refer to a string entry.
    pub fn string(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::String { string_index } => self.utf8(*string_index),
            other => Err(malformed_error!(
                "Constant {} is not a string: {:?}",
                index,
                other
            )),
        }
    }

    /// Resolve a field, method or interface method reference.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the index does not refer to a member reference.
    pub fn member_ref(&self, index: u16) -> Result<MemberRef<'_>> {
        let (class_index, nat_index) = match self.get(index)? {
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            }
            | Constant::MethodRef {
                class_index,
                name_and_type_index,
            }
            | Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index),
            other => {
                return Err(malformed_error!(
                    "Constant {} is not a member reference: {:?}",
                    index,
                    other
                ))
            }
        };

        let Constant::NameAndType {
            name_index,
            descriptor_index,
        } = self.get(nat_index)?
        else {
            return Err(malformed_error!(
                "Constant {} is not a name and type",
                nat_index
            ));
        };

        Ok(MemberRef {
            owner: self.class_name(class_index)?,
            name: self.utf8(*name_index)?,
            descriptor: self.utf8(*descriptor_index)?,
        })
    }

    /// Append an entry, or return the index of an identical existing one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] when the pool is full.
    pub fn find_or_add(&mut self, constant: Constant) -> Result<u16> {
        if let Some(index) = self.lookup.get(&constant) {
            return Ok(*index);
        }

        let slots = if constant.is_wide() { 2 } else { 1 };
        if self.entries.len() + slots > usize::from(u16::MAX) {
            return Err(Error::ConstantPoolOverflow);
        }

        let index = u16::try_from(self.entries.len()).map_err(|_| Error::ConstantPoolOverflow)?;
        let wide = constant.is_wide();
        self.lookup.insert(constant.clone(), index);
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    /// Index of a `CONSTANT_Utf8` entry with the given text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] when the pool is full.
    pub fn utf8_index(&mut self, text: &str) -> Result<u16> {
        if let Some(index) = self.find_utf8(text) {
            return Ok(index);
        }
        self.find_or_add(Constant::Utf8(text.to_string()))
    }

    /// Index of an existing `CONSTANT_Utf8` entry, without adding one.
    #[must_use]
    pub fn find_utf8(&self, text: &str) -> Option<u16> {
        self.lookup.get(&Constant::Utf8(text.to_string())).copied()
    }

    /// Index of a `CONSTANT_Class` entry for an internal name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] when the pool is full.
    pub fn class_index(&mut self, internal_name: &str) -> Result<u16> {
        let name_index = self.utf8_index(internal_name)?;
        self.find_or_add(Constant::Class { name_index })
    }

    /// Index of a `CONSTANT_String` entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] when the pool is full.
    pub fn string_index(&mut self, value: &str) -> Result<u16> {
        let string_index = self.utf8_index(value)?;
        self.find_or_add(Constant::String { string_index })
    }

    /// Index of a `CONSTANT_NameAndType` entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] when the pool is full.
    pub fn name_and_type_index(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.utf8_index(name)?;
        let descriptor_index = self.utf8_index(descriptor)?;
        self.find_or_add(Constant::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    /// Index of a `CONSTANT_Fieldref` entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] when the pool is full.
    pub fn field_ref_index(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class_index = self.class_index(owner)?;
        let name_and_type_index = self.name_and_type_index(name, descriptor)?;
        self.find_or_add(Constant::FieldRef {
            class_index,
            name_and_type_index,
        })
    }

    /// Index of a `CONSTANT_Methodref` or `CONSTANT_InterfaceMethodref` entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] when the pool is full.
    pub fn method_ref_index(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<u16> {
        let class_index = self.class_index(owner)?;
        let name_and_type_index = self.name_and_type_index(name, descriptor)?;
        if interface {
            self.find_or_add(Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            })
        } else {
            self.find_or_add(Constant::MethodRef {
                class_index,
                name_and_type_index,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(pool: &ConstantPool) -> Result<ConstantPool> {
        let mut writer = Writer::new();
        pool.write(&mut writer)?;
        let bytes = writer.into_inner();
        let mut parser = Parser::new(&bytes);
        let parsed = ConstantPool::parse(&mut parser)?;
        assert!(!parser.has_more_data());
        Ok(parsed)
    }

    #[test]
    fn wide_entries_take_two_slots() -> Result<()> {
        let mut pool = ConstantPool::new();
        let long = pool.find_or_add(Constant::Long(42))?;
        let after = pool.utf8_index("after")?;

        assert_eq!(long, 1);
        assert_eq!(after, 3);
        assert!(pool.get(2).is_err());
        assert_eq!(roundtrip(&pool)?, pool);
        Ok(())
    }

    #[test]
    fn member_refs_are_shared() -> Result<()> {
        let mut pool = ConstantPool::new();
        let first = pool.method_ref_index("a/B", "run", "()V", false)?;
        let second = pool.method_ref_index("a/B", "run", "()V", false)?;
        let iface = pool.method_ref_index("a/B", "run", "()V", true)?;

        assert_eq!(first, second);
        assert_ne!(first, iface);
        let resolved = pool.member_ref(first)?;
        assert_eq!(resolved.owner, "a/B");
        assert_eq!(resolved.name, "run");
        assert_eq!(resolved.descriptor, "()V");
        assert_eq!(resolved.to_string(), "a/B.run:()V");
        Ok(())
    }

    #[test]
    fn typed_lookups_reject_wrong_kinds() -> Result<()> {
        let mut pool = ConstantPool::new();
        let text = pool.utf8_index("hello")?;
        let string = pool.string_index("hello")?;

        assert_eq!(pool.string(string)?, "hello");
        assert!(pool.class_name(text).is_err());
        assert!(pool.utf8(string).is_err());
        assert!(pool.get(0).is_err());
        assert!(pool.get(99).is_err());
        Ok(())
    }

    #[test]
    fn lone_surrogate_survives_roundtrip() -> Result<()> {
        let raw = vec![0xED, 0xA0, 0x80, b'x'];
        let mut bytes = vec![0x00, 0x03, tag::UTF8, 0x00, 0x04];
        bytes.extend_from_slice(&raw);
        bytes.extend_from_slice(&[tag::STRING, 0x00, 0x01]);

        let pool = ConstantPool::parse(&mut Parser::new(&bytes))?;
        assert_eq!(pool.get(1)?, &Constant::Utf8Raw(raw));
        assert!(pool.string(2).is_err());

        let mut writer = Writer::new();
        pool.write(&mut writer)?;
        assert_eq!(writer.into_inner(), bytes);
        Ok(())
    }

    #[test]
    fn unknown_tag_is_malformed() {
        let bytes = [0x00, 0x02, 0x02, 0x00];
        let mut parser = Parser::new(&bytes);
        assert!(matches!(
            ConstantPool::parse(&mut parser),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn wide_entry_in_last_slot_is_malformed() {
        let mut bytes = vec![0x00, 0x02, tag::LONG];
        bytes.extend_from_slice(&7_i64.to_be_bytes());
        let mut parser = Parser::new(&bytes);
        assert!(ConstantPool::parse(&mut parser).is_err());
    }

    #[test]
    fn overflow_is_reported() -> Result<()> {
        let mut pool = ConstantPool::new();
        for i in 0..(u16::MAX - 1) {
            pool.find_or_add(Constant::Integer(i32::from(i)))?;
        }
        assert_eq!(pool.len(), usize::from(u16::MAX));
        assert!(matches!(
            pool.utf8_index("one too many"),
            Err(Error::ConstantPoolOverflow)
        ));
        Ok(())
    }
}

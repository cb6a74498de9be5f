//! Fluent builders for fields, methods and whole class files.
//!
//! [`FieldBuilder`] and [`MethodBuilder`] add members to an existing [`ClassFile`], interning
//! every name they need in its constant pool. [`ClassFileBuilder`] assembles a complete class
//! from scratch, which the CLI and the test suites use to produce fixtures without a compiler.
//!
//! # Examples
//!
//! ```rust
//! use probeweave::classfile::{
//!     ClassFileBuilder, FieldAccessFlags, FieldBuilder, MethodAccessFlags, MethodBuilder,
//! };
//!
//! let mut class = ClassFileBuilder::new("com/acme/Job").build()?;
//! let field = FieldBuilder::new("counter", "J")
//!     .flags(FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC)
//!     .build(&mut class)?;
//! let method = MethodBuilder::new("execute", "(Ljava/lang/String;)V")
//!     .flags(MethodAccessFlags::PUBLIC)
//!     .annotation("io.probeweave.annotations.Task")
//!     .body(0, 2, vec![0xB1])
//!     .build(&mut class)?;
//!
//! assert_eq!(class.find_field("counter"), Some(field));
//! assert_eq!(class.find_method("execute", "(Ljava/lang/String;)V"), Some(method));
//! # Ok::<(), probeweave::Error>(())
//! ```

use crate::{
    classfile::{
        access::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags},
        attributes::{names, Attribute, CodeAttribute},
        constpool::ConstantPool,
        descriptor::{FieldType, MethodType},
        members::{FieldInfo, MethodInfo},
        ClassFile,
    },
    file::writer::Writer,
    Result,
};

/// Builder for a field declaration.
pub struct FieldBuilder {
    name: String,
    descriptor: String,
    flags: FieldAccessFlags,
}

impl FieldBuilder {
    /// Creates a new `FieldBuilder` for a package-private instance field.
    #[must_use]
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            flags: FieldAccessFlags::empty(),
        }
    }

    /// Sets the access flags.
    #[must_use]
    pub fn flags(mut self, flags: FieldAccessFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Appends the field to `class` and returns its index in the field table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidDescriptor`] for an invalid descriptor and
    /// [`crate::Error::ConstantPoolOverflow`] when the names cannot be interned.
    pub fn build(self, class: &mut ClassFile) -> Result<usize> {
        let field = self.into_info(&mut class.constant_pool)?;
        class.fields.push(field);
        Ok(class.fields.len() - 1)
    }

    fn into_info(self, pool: &mut ConstantPool) -> Result<FieldInfo> {
        FieldType::parse(&self.descriptor)?;
        Ok(FieldInfo {
            access_flags: self.flags,
            name_index: pool.utf8_index(&self.name)?,
            descriptor_index: pool.utf8_index(&self.descriptor)?,
            attributes: Vec::new(),
        })
    }
}

/// Builder for a method declaration.
pub struct MethodBuilder {
    name: String,
    descriptor: String,
    flags: MethodAccessFlags,
    annotations: Vec<String>,
    code: Option<CodeAttribute>,
    attributes: Vec<Attribute>,
}

impl MethodBuilder {
    /// Creates a new `MethodBuilder` for a package-private instance method.
    #[must_use]
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            flags: MethodAccessFlags::empty(),
            annotations: Vec::new(),
            code: None,
            attributes: Vec::new(),
        }
    }

    /// Sets the access flags.
    #[must_use]
    pub fn flags(mut self, flags: MethodAccessFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds a runtime-visible annotation without elements.
    ///
    /// # Arguments
    ///
    /// * `annotation` - Annotation type in binary notation, e.g. `io.probeweave.annotations.Task`
    #[must_use]
    pub fn annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Sets the method body from raw bytecode.
    #[must_use]
    pub fn body(self, max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        self.code(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        })
    }

    /// Sets a fully specified `Code` attribute.
    #[must_use]
    pub fn code(mut self, code: CodeAttribute) -> Self {
        self.code = Some(code);
        self
    }

    /// Adds an attribute whose name is already interned in the target pool.
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Appends the method to `class` and returns its index in the method table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidDescriptor`] for an invalid descriptor,
    /// [`crate::Error::Malformed`] when an abstract or native method is given a body, and
    /// [`crate::Error::ConstantPoolOverflow`] when names cannot be interned.
    pub fn build(self, class: &mut ClassFile) -> Result<usize> {
        let method = self.into_info(&mut class.constant_pool)?;
        class.methods.push(method);
        Ok(class.methods.len() - 1)
    }

    fn into_info(self, pool: &mut ConstantPool) -> Result<MethodInfo> {
        MethodType::parse(&self.descriptor)?;
        if self.flags.is_bodiless() && self.code.is_some() {
            return Err(malformed_error!(
                "Method {} is abstract or native and cannot have code",
                self.name
            ));
        }

        let mut attributes = self.attributes;
        if let Some(code) = &self.code {
            attributes.insert(0, Attribute::new(pool, names::CODE, code.to_bytes()?)?);
        }
        if !self.annotations.is_empty() {
            let mut writer = Writer::new();
            writer.write_len_u16(self.annotations.len(), "annotations")?;
            for annotation in &self.annotations {
                let descriptor = format!("L{};", annotation.replace('.', "/"));
                writer.write_be(pool.utf8_index(&descriptor)?);
                writer.write_be(0_u16);
            }
            attributes.push(Attribute::new(
                pool,
                names::RUNTIME_VISIBLE_ANNOTATIONS,
                writer.into_inner(),
            )?);
        }

        Ok(MethodInfo {
            access_flags: self.flags,
            name_index: pool.utf8_index(&self.name)?,
            descriptor_index: pool.utf8_index(&self.descriptor)?,
            attributes,
        })
    }
}

/// Builder for a complete class file.
pub struct ClassFileBuilder {
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    flags: ClassAccessFlags,
    major_version: u16,
    minor_version: u16,
    fields: Vec<FieldBuilder>,
    methods: Vec<MethodBuilder>,
}

impl ClassFileBuilder {
    /// Creates a builder for a public class extending `java/lang/Object`, version 52.0.
    ///
    /// `name` may be given in internal (`a/b/C`) or binary (`a.b.C`) form.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().replace('.', "/"),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            major_version: 52,
            minor_version: 0,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Sets the class file version.
    #[must_use]
    pub fn version(mut self, major: u16, minor: u16) -> Self {
        self.major_version = major;
        self.minor_version = minor;
        self
    }

    /// Sets the class access flags.
    #[must_use]
    pub fn flags(mut self, flags: ClassAccessFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Convenience for a public interface.
    #[must_use]
    pub fn public_interface(self) -> Self {
        self.flags(ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT)
    }

    /// Sets the superclass in internal form.
    #[must_use]
    pub fn super_class(mut self, name: impl Into<String>) -> Self {
        self.super_name = Some(name.into());
        self
    }

    /// Adds a direct superinterface in internal form.
    #[must_use]
    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldBuilder) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a method.
    #[must_use]
    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Builds the class file model.
    ///
    /// # Errors
    ///
    /// Returns an error if any member is invalid or the constant pool overflows.
    pub fn build(self) -> Result<ClassFile> {
        let mut constant_pool = ConstantPool::new();
        let this_class = constant_pool.class_index(&self.name)?;
        let super_class = match &self.super_name {
            Some(name) => constant_pool.class_index(name)?,
            None => 0,
        };
        let interfaces = self
            .interfaces
            .iter()
            .map(|name| constant_pool.class_index(name))
            .collect::<Result<Vec<_>>>()?;

        let mut class = ClassFile {
            minor_version: self.minor_version,
            major_version: self.major_version,
            constant_pool,
            access_flags: self.flags,
            this_class,
            super_class,
            interfaces,
            fields: Vec::with_capacity(self.fields.len()),
            methods: Vec::with_capacity(self.methods.len()),
            attributes: Vec::new(),
        };
        for field in self.fields {
            field.build(&mut class)?;
        }
        for method in self.methods {
            method.build(&mut class)?;
        }
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn method_with_annotation() -> Result<()> {
        let mut class = ClassFileBuilder::new("com.acme.Job").build()?;
        let index = MethodBuilder::new("run", "()V")
            .annotation("io.probeweave.annotations.Task")
            .annotation("java.lang.Deprecated")
            .body(0, 1, vec![0xB1])
            .build(&mut class)?;

        let method = &class.methods[index];
        assert_eq!(
            method.visible_annotations(&class.constant_pool)?,
            vec!["io.probeweave.annotations.Task", "java.lang.Deprecated"]
        );
        assert_eq!(
            method.code(&class.constant_pool)?.map(|code| code.code),
            Some(vec![0xB1])
        );
        assert_eq!(class.name()?, "com/acme/Job");
        Ok(())
    }

    #[test]
    fn abstract_method_has_no_code() -> Result<()> {
        let mut class = ClassFileBuilder::new("com/acme/Job").build()?;
        let result = MethodBuilder::new("run", "()V")
            .flags(MethodAccessFlags::ABSTRACT)
            .body(0, 1, vec![0xB1])
            .build(&mut class);
        assert!(matches!(result, Err(Error::Malformed { .. })));

        let index = MethodBuilder::new("run", "()V")
            .flags(MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT)
            .build(&mut class)?;
        assert!(class.methods[index].code(&class.constant_pool)?.is_none());
        Ok(())
    }

    #[test]
    fn invalid_descriptors_rejected() -> Result<()> {
        let mut class = ClassFileBuilder::new("com/acme/Job").build()?;
        assert!(FieldBuilder::new("x", "Q").build(&mut class).is_err());
        assert!(MethodBuilder::new("x", "V").build(&mut class).is_err());
        assert!(class.fields.is_empty() && class.methods.is_empty());
        Ok(())
    }
}

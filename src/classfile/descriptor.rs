//! Field and method descriptors (JVMS §4.3).
//!
//! Descriptors are decoded into [`FieldType`] and [`MethodType`], which know their stack slot
//! sizes (needed to lay out locals in generated code) and render themselves in Java source
//! notation (needed for the argument-qualified long name of a method).
//!
//! # Examples
//!
//! ```rust
//! use probeweave::classfile::{FieldType, MethodType};
//!
//! let method = MethodType::parse("(I[Ljava/lang/String;J)V")?;
//! assert_eq!(method.params.len(), 3);
//! assert_eq!(method.param_slots(), 4);
//! assert_eq!(method.java_params(), "int,java.lang.String[],long");
//! assert!(method.ret.is_none());
//!
//! assert_eq!(FieldType::parse("[[D")?.java_name(), "double[][]");
//! # Ok::<(), probeweave::Error>(())
//! ```

use std::fmt;

use crate::{Error, Result};

/// A field type: a primitive, a class reference or an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `D`
    Double,
    /// `F`
    Float,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `S`
    Short,
    /// `Z`
    Boolean,
    /// `L<internal name>;`
    Object(String),
    /// `[<component>`
    Array(Box<FieldType>),
}

impl FieldType {
    /// Parse a complete field descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidDescriptor`] if the text is not exactly one field type.
    pub fn parse(descriptor: &str) -> Result<FieldType> {
        let (field, rest) = Self::parse_prefix(descriptor)?;
        if !rest.is_empty() {
            return Err(Error::InvalidDescriptor(descriptor.to_string()));
        }
        Ok(field)
    }

    fn parse_prefix(text: &str) -> Result<(FieldType, &str)> {
        let invalid = || Error::InvalidDescriptor(text.to_string());
        let mut chars = text.chars();
        let first = chars.next().ok_or_else(invalid)?;
        let rest = chars.as_str();
        let field = match first {
            'B' => FieldType::Byte,
            'C' => FieldType::Char,
            'D' => FieldType::Double,
            'F' => FieldType::Float,
            'I' => FieldType::Int,
            'J' => FieldType::Long,
            'S' => FieldType::Short,
            'Z' => FieldType::Boolean,
            'L' => {
                let end = rest.find(';').ok_or_else(invalid)?;
                if end == 0 {
                    return Err(invalid());
                }
                return Ok((FieldType::Object(rest[..end].to_string()), &rest[end + 1..]));
            }
            '[' => {
                let (component, rest) = Self::parse_prefix(rest)?;
                return Ok((FieldType::Array(Box::new(component)), rest));
            }
            _ => return Err(invalid()),
        };
        Ok((field, rest))
    }

    /// Number of local variable / operand stack slots the type occupies.
    #[must_use]
    pub fn slots(&self) -> u16 {
        match self {
            FieldType::Long | FieldType::Double => 2,
            _ => 1,
        }
    }

    /// Returns true for the eight primitive types.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    /// Returns true for class and array references.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    /// The name used by `CONSTANT_Class` for this type: the internal name for classes and
    /// the descriptor for arrays. `None` for primitives.
    #[must_use]
    pub fn class_constant_name(&self) -> Option<String> {
        match self {
            FieldType::Object(name) => Some(name.clone()),
            FieldType::Array(_) => Some(self.descriptor()),
            _ => None,
        }
    }

    /// Render the type in Java source notation, e.g. `java.lang.String[]`.
    ///
    /// Nested class separators (`$`) are kept, matching binary class names.
    #[must_use]
    pub fn java_name(&self) -> String {
        match self {
            FieldType::Byte => "byte".to_string(),
            FieldType::Char => "char".to_string(),
            FieldType::Double => "double".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Int => "int".to_string(),
            FieldType::Long => "long".to_string(),
            FieldType::Short => "short".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Object(name) => name.replace('/', "."),
            FieldType::Array(component) => format!("{}[]", component.java_name()),
        }
    }

    /// Render the type back into descriptor form.
    #[must_use]
    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Byte => f.write_str("B"),
            FieldType::Char => f.write_str("C"),
            FieldType::Double => f.write_str("D"),
            FieldType::Float => f.write_str("F"),
            FieldType::Int => f.write_str("I"),
            FieldType::Long => f.write_str("J"),
            FieldType::Short => f.write_str("S"),
            FieldType::Boolean => f.write_str("Z"),
            FieldType::Object(name) => write!(f, "L{name};"),
            FieldType::Array(component) => write!(f, "[{component}"),
        }
    }
}

/// A method type: parameter types and an optional return type (`None` is `void`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodType {
    /// Parameter types in declaration order
    pub params: Vec<FieldType>,
    /// Return type, `None` for `void`
    pub ret: Option<FieldType>,
}

impl MethodType {
    /// Parse a method descriptor such as `(ILjava/lang/String;)V`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidDescriptor`] if the text is not a method descriptor.
    pub fn parse(descriptor: &str) -> Result<MethodType> {
        let invalid = || Error::InvalidDescriptor(descriptor.to_string());
        let mut rest = descriptor.strip_prefix('(').ok_or_else(invalid)?;

        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                return Err(invalid());
            }
            let (param, after) = FieldType::parse_prefix(rest).map_err(|_| invalid())?;
            params.push(param);
            rest = after;
        }

        let ret = if rest == "V" {
            None
        } else {
            Some(FieldType::parse(rest).map_err(|_| invalid())?)
        };

        Ok(MethodType { params, ret })
    }

    /// Total local variable slots taken by the parameters (excluding `this`).
    #[must_use]
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(FieldType::slots).sum()
    }

    /// Operand stack slots produced by the return value.
    #[must_use]
    pub fn return_slots(&self) -> u16 {
        self.ret.as_ref().map_or(0, FieldType::slots)
    }

    /// Parameter types in Java source notation, comma separated without spaces.
    #[must_use]
    pub fn java_params(&self) -> String {
        self.params
            .iter()
            .map(FieldType::java_name)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Render the method type back into descriptor form.
    #[must_use]
    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{param}")?;
        }
        f.write_str(")")?;
        match &self.ret {
            Some(ret) => write!(f, "{ret}"),
            None => f.write_str("V"),
        }
    }
}

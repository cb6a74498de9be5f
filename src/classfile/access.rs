//! Access and property flags for classes, fields and methods (JVMS §4.1, §4.5, §4.6).
//!
//! Unknown bits are retained on parse (`from_bits_retain`) so that serialization never
//! silently drops flags introduced by newer class file versions.

use bitflags::bitflags;

bitflags! {
    /// Class access and property modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassAccessFlags: u16 {
        /// Declared `public`.
        const PUBLIC = 0x0001;
        /// Declared `final`.
        const FINAL = 0x0010;
        /// Treat superclass methods specially with `invokespecial`.
        const SUPER = 0x0020;
        /// Is an interface, not a class.
        const INTERFACE = 0x0200;
        /// Declared `abstract`.
        const ABSTRACT = 0x0400;
        /// Not present in source code.
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface.
        const ANNOTATION = 0x2000;
        /// Declared as an enum class.
        const ENUM = 0x4000;
        /// Is a module, not a class or interface.
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// Field access and property modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAccessFlags: u16 {
        /// Declared `public`.
        const PUBLIC = 0x0001;
        /// Declared `private`.
        const PRIVATE = 0x0002;
        /// Declared `protected`.
        const PROTECTED = 0x0004;
        /// Declared `static`.
        const STATIC = 0x0008;
        /// Declared `final`.
        const FINAL = 0x0010;
        /// Declared `volatile`.
        const VOLATILE = 0x0040;
        /// Declared `transient`.
        const TRANSIENT = 0x0080;
        /// Not present in source code.
        const SYNTHETIC = 0x1000;
        /// Element of an enum class.
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Method access and property modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAccessFlags: u16 {
        /// Declared `public`.
        const PUBLIC = 0x0001;
        /// Declared `private`.
        const PRIVATE = 0x0002;
        /// Declared `protected`.
        const PROTECTED = 0x0004;
        /// Declared `static`.
        const STATIC = 0x0008;
        /// Declared `final`.
        const FINAL = 0x0010;
        /// Declared `synchronized`.
        const SYNCHRONIZED = 0x0020;
        /// A bridge method, generated by the compiler.
        const BRIDGE = 0x0040;
        /// Declared with a variable number of arguments.
        const VARARGS = 0x0080;
        /// Declared `native`.
        const NATIVE = 0x0100;
        /// Declared `abstract`.
        const ABSTRACT = 0x0400;
        /// In a class file with a major version between 46 and 60, declared `strictfp`.
        const STRICT = 0x0800;
        /// Not present in source code.
        const SYNTHETIC = 0x1000;
    }
}

impl MethodAccessFlags {
    /// Returns true if the method has no code attribute by definition.
    #[must_use]
    pub fn is_bodiless(self) -> bool {
        self.intersects(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bits_are_retained() {
        let flags = MethodAccessFlags::from_bits_retain(0x8009);
        assert!(flags.contains(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC));
        assert_eq!(flags.bits(), 0x8009);
    }

    #[test]
    fn bodiless_methods() {
        assert!(MethodAccessFlags::ABSTRACT.is_bodiless());
        assert!((MethodAccessFlags::NATIVE | MethodAccessFlags::PUBLIC).is_bodiless());
        assert!(!MethodAccessFlags::PUBLIC.is_bodiless());
    }
}

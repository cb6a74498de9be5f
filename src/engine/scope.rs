//! Scope classification.
//!
//! A unit is in scope when it declares at least one method carrying the task marker and it is
//! not the thin half of a singleton/companion pair. Some source languages compile one logical
//! module into two units, `Name` (static forwarders) and `Name$` (the implementation). Both can
//! show the marker, but only `Name$` runs the body, so a plain `Name` whose companion `Name$` is
//! resolvable is declined and instrumentation is left to the companion.
//!
//! The companion probe goes through [`UnitResolver`], which lets callers plug in a real loader
//! view, a fixed set of names, or a closure.

use std::collections::HashSet;

use strum::{Display, IntoStaticStr};

use crate::{
    classfile::{ClassFile, MethodAccessFlags, MethodType},
    engine::TASK_MARKER,
    Result,
};

/// Answers whether a unit with the given binary name can be resolved by the current loader.
pub trait UnitResolver: Send + Sync {
    /// Returns true if the unit `name` (binary form, e.g. `a.b.C$`) exists.
    fn resolve(&self, name: &str) -> bool;
}

impl<F> UnitResolver for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn resolve(&self, name: &str) -> bool {
        self(name)
    }
}

impl UnitResolver for HashSet<String> {
    fn resolve(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// A resolver that never finds a companion.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompanions;

impl UnitResolver for NoCompanions {
    fn resolve(&self, _name: &str) -> bool {
        false
    }
}

/// Normalize a unit name to binary form (`a/b/C` becomes `a.b.C`).
#[must_use]
pub fn normalize_unit_name(name: &str) -> String {
    name.replace('/', ".")
}

/// Render the argument-qualified long name of a method, e.g.
/// `com.acme.Job.execute(int,java.lang.String[])`.
#[must_use]
pub fn long_name(owner: &str, name: &str, method: &MethodType) -> String {
    format!("{owner}.{name}({})", method.java_params())
}

/// Everything the engine needs to know about one declared method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Binary name of the owning unit
    pub owner: String,
    /// Short method name
    pub name: String,
    /// Argument-qualified long name
    pub long_name: String,
    /// JVM method descriptor
    pub descriptor: String,
    /// Access flags
    pub access_flags: MethodAccessFlags,
    /// Index in the owning class's method table
    pub index: usize,
    /// Runtime-visible annotation types in binary notation
    pub annotations: Vec<String>,
}

impl MethodDescriptor {
    /// Describe a method without a backing class file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidDescriptor`] if `descriptor` is not a method descriptor.
    pub fn new(owner: &str, name: &str, descriptor: &str) -> Result<Self> {
        let method = MethodType::parse(descriptor)?;
        let owner = normalize_unit_name(owner);
        Ok(MethodDescriptor {
            long_name: long_name(&owner, name, &method),
            owner,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access_flags: MethodAccessFlags::PUBLIC,
            index: 0,
            annotations: Vec::new(),
        })
    }

    /// Adds an annotation type.
    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Sets the access flags.
    #[must_use]
    pub fn with_flags(mut self, flags: MethodAccessFlags) -> Self {
        self.access_flags = flags;
        self
    }

    /// Describe method `index` of `class`.
    ///
    /// # Errors
    ///
    /// Returns an error if the method's name, descriptor or annotations cannot be decoded.
    pub fn from_class(class: &ClassFile, index: usize) -> Result<Self> {
        let pool = &class.constant_pool;
        let method = class
            .methods
            .get(index)
            .ok_or_else(|| malformed_error!("Method index {} out of range", index))?;
        let mut descriptor =
            MethodDescriptor::new(class.name()?, method.name(pool)?, method.descriptor(pool)?)?;
        descriptor.access_flags = method.access_flags;
        descriptor.index = index;
        descriptor.annotations = method.visible_annotations(pool)?;
        Ok(descriptor)
    }

    /// Describe every method of `class` in table order.
    ///
    /// # Errors
    ///
    /// Returns an error if any method cannot be decoded.
    pub fn all(class: &ClassFile) -> Result<Vec<Self>> {
        (0..class.methods.len())
            .map(|index| MethodDescriptor::from_class(class, index))
            .collect()
    }

    /// Returns true for `<init>` and `<clinit>`.
    #[must_use]
    pub fn is_initializer(&self) -> bool {
        self.name.starts_with('<')
    }
}

/// Returns true if the method carries the task marker.
#[must_use]
pub fn has_marker(method: &MethodDescriptor) -> bool {
    method.annotations.iter().any(|a| a == TASK_MARKER)
}

/// Why a unit is not instrumented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum OutOfScope {
    /// The bytes are not a readable class file.
    Unparseable,
    /// No declared method carries the task marker.
    NoMarker,
    /// The unit is the thin half of a singleton pair; its `$` companion is resolvable.
    CompanionPresent,
}

/// Result of classification.
#[derive(Debug)]
pub enum ScopeDecision<T = ScopedUnit> {
    /// The unit should be instrumented.
    InScope(T),
    /// The unit is left alone.
    OutOfScope(OutOfScope),
}

impl<T> ScopeDecision<T> {
    /// Returns true for [`ScopeDecision::InScope`].
    #[must_use]
    pub fn is_in_scope(&self) -> bool {
        matches!(self, ScopeDecision::InScope(_))
    }

    /// The decline kind, if out of scope.
    #[must_use]
    pub fn out_of_scope(&self) -> Option<OutOfScope> {
        match self {
            ScopeDecision::InScope(_) => None,
            ScopeDecision::OutOfScope(kind) => Some(*kind),
        }
    }
}

/// A classified unit: the parsed class and its method descriptors, reused by later stages.
#[derive(Debug, Clone)]
pub struct ScopedUnit {
    /// Normalized binary name
    pub name: String,
    /// The parsed class file
    pub class: ClassFile,
    /// Descriptors of all methods in table order
    pub methods: Vec<MethodDescriptor>,
}

impl ScopedUnit {
    /// Marked methods eligible for wrapping.
    pub fn marked(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods
            .iter()
            .filter(|method| !method.is_initializer() && has_marker(method))
    }
}

/// Decide scope over already-described methods.
///
/// This is the whole decision minus parsing, so it can be driven with synthetic descriptors.
pub fn classify_methods(
    methods: &[MethodDescriptor],
    unit_name: &str,
    resolver: &dyn UnitResolver,
) -> ScopeDecision<()> {
    if !methods
        .iter()
        .any(|method| !method.is_initializer() && has_marker(method))
    {
        return ScopeDecision::OutOfScope(OutOfScope::NoMarker);
    }

    let name = normalize_unit_name(unit_name);
    if name.contains('$') {
        return ScopeDecision::InScope(());
    }
    if resolver.resolve(&format!("{name}$")) {
        log::debug!("{name}: companion {name}$ is resolvable, deferring to it");
        return ScopeDecision::OutOfScope(OutOfScope::CompanionPresent);
    }
    ScopeDecision::InScope(())
}

/// Classify a unit from its bytes.
///
/// Never fails: unreadable input is [`OutOfScope::Unparseable`].
pub fn classify(bytes: &[u8], unit_name: &str, resolver: &dyn UnitResolver) -> ScopeDecision {
    let parsed = ClassFile::parse(bytes).and_then(|class| {
        let methods = MethodDescriptor::all(&class)?;
        Ok((class, methods))
    });
    let (class, methods) = match parsed {
        Ok(parsed) => parsed,
        Err(error) => {
            log::debug!("{unit_name}: not a readable class file ({error})");
            return ScopeDecision::OutOfScope(OutOfScope::Unparseable);
        }
    };

    match classify_methods(&methods, unit_name, resolver) {
        ScopeDecision::InScope(()) => ScopeDecision::InScope(ScopedUnit {
            name: normalize_unit_name(unit_name),
            class,
            methods,
        }),
        ScopeDecision::OutOfScope(kind) => ScopeDecision::OutOfScope(kind),
    }
}

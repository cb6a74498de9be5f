//! The rewrite engine.
//!
//! Data flows in one direction: raw bytes are classified ([`scope`]), units in scope get the hook
//! field ([`hook`]), every marked method is wrapped with probes ([`wrapper`]) and the class is
//! serialized again. The [`orchestrator`] drives these stages inside failure containment and
//! reports a [`RewriteOutcome`] instead of an error.
//!
//! # Examples
//!
//! ```rust
//! use probeweave::{
//!     classfile::{ClassFileBuilder, MethodBuilder},
//!     engine::{NoCompanions, RewriteOutcome, Rewriter, TASK_MARKER},
//! };
//!
//! let bytes = ClassFileBuilder::new("com/acme/Job")
//!     .method(MethodBuilder::new("run", "()V").annotation(TASK_MARKER).body(0, 1, vec![0xB1]))
//!     .build()?
//!     .to_bytes()?;
//!
//! let rewriter = Rewriter::default();
//! match rewriter.rewrite(&bytes, "com/acme/Job", &NoCompanions) {
//!     RewriteOutcome::Transformed(out) => assert_ne!(out, bytes),
//!     RewriteOutcome::Declined(reason) => panic!("declined: {reason}"),
//! }
//! # Ok::<(), probeweave::Error>(())
//! ```

pub mod config;
pub mod hook;
pub mod identity;
pub mod orchestrator;
pub mod pool;
pub mod scope;
pub mod wrapper;

pub use config::{ConfigKey, EngineConfig};
pub use hook::{ensure_hook_field, HookInjection};
pub use identity::{canonical_key, canonicalize};
pub use orchestrator::{
    ClassFileTransformer, DeclineReason, ExistingDefinition, LoadRequest, ProtectionDomain,
    RewriteOutcome, RewriteStats, Rewriter, StatsSnapshot,
};
pub use pool::UnitPool;
pub use scope::{
    classify, classify_methods, has_marker, MethodDescriptor, NoCompanions, OutOfScope,
    ScopeDecision, ScopedUnit, UnitResolver,
};
pub use wrapper::{wrap_method, wrap_methods, WrapOutcome};

/// Binary name of the task marker annotation.
pub const TASK_MARKER: &str = "io.probeweave.annotations.Task";

/// Suffix of the renamed original method body.
pub const WRAPPED_SUFFIX: &str = "$tracked";

/// How rewritten code reaches the tracking facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeBinding {
    /// Internal name of the facade class
    pub facade_class: String,
    /// Name of the static accessor returning the singleton
    pub accessor: String,
    /// Name of the injected static field
    pub hook_field: String,
    /// `(String owner, String method, Object[] args)V` probe
    pub before_probe: String,
    /// `(String method, Object result)V` probe
    pub after_probe: String,
    /// `(String method, Throwable error)V` probe
    pub error_probe: String,
}

impl Default for FacadeBinding {
    fn default() -> Self {
        FacadeBinding {
            facade_class: "io/probeweave/Tracker".to_string(),
            accessor: "instance".to_string(),
            hook_field: "$probeweave".to_string(),
            before_probe: "beforeTask".to_string(),
            after_probe: "afterTask".to_string(),
            error_probe: "errorTask".to_string(),
        }
    }
}

impl FacadeBinding {
    /// Descriptor of the hook field.
    #[must_use]
    pub fn facade_descriptor(&self) -> String {
        format!("L{};", self.facade_class)
    }

    /// Descriptor of the singleton accessor.
    #[must_use]
    pub fn accessor_descriptor(&self) -> String {
        format!("()L{};", self.facade_class)
    }
}

/// Descriptor of the before probe.
pub const BEFORE_DESCRIPTOR: &str = "(Ljava/lang/String;Ljava/lang/String;[Ljava/lang/Object;)V";
/// Descriptor of the after probe.
pub const AFTER_DESCRIPTOR: &str = "(Ljava/lang/String;Ljava/lang/Object;)V";
/// Descriptor of the error probe.
pub const ERROR_DESCRIPTOR: &str = "(Ljava/lang/String;Ljava/lang/Throwable;)V";

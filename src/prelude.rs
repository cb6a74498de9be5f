//! # probeweave Prelude
//!
//! The types needed to host the rewrite engine, build or inspect class files and receive
//! tracking events, in one glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all probeweave operations
pub use crate::Error;

/// The result type used throughout probeweave
pub use crate::Result;

/// Low-level byte access
pub use crate::{Parser, UnitFile, Writer};

// ================================================================================================
// Class File Model
// ================================================================================================

pub use crate::classfile::{
    Attribute, ClassAccessFlags, ClassFile, ClassFileBuilder, CodeAttribute, ConstantPool,
    FieldAccessFlags, FieldBuilder, FieldInfo, FieldType, MethodAccessFlags, MethodBuilder,
    MethodInfo, MethodType,
};

// ================================================================================================
// Bytecode
// ================================================================================================

pub use crate::bytecode::{decode_stream, CodeAssembler, Instruction, StackMapTable};

// ================================================================================================
// Rewrite Engine
// ================================================================================================

pub use crate::engine::{
    canonicalize, classify, ClassFileTransformer, DeclineReason, EngineConfig, FacadeBinding,
    LoadRequest, MethodDescriptor, NoCompanions, OutOfScope, RewriteOutcome, Rewriter,
    ScopeDecision, UnitPool, UnitResolver, TASK_MARKER, WRAPPED_SUFFIX,
};

// ================================================================================================
// Agent and Tracking
// ================================================================================================

pub use crate::agent::{premain, Agent, Instrumentation};
pub use crate::tracking::{TaskError, TaskValue, Tracker, TrackingFacade};

// Copyright 2026 The probeweave Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]
// - 'file/physical.rs' maps class files into memory

//! # probeweave
//!
//! A load-time class file rewriting engine. As each JVM class is loaded, `probeweave` decides
//! whether it declares methods carrying the `io.probeweave.annotations.Task` marker and, if so,
//! rewrites the class so that the tracking facade is called before every marked method runs,
//! after it returns and when it throws. Source code stays untouched.
//!
//! ## Features
//!
//! - **Never breaks a load** - every failure degrades to "keep the original bytes"
//! - **Idempotent** - the facade hook is injected once and wrapped methods are never wrapped twice
//! - **Stable correlation** - events of one invocation share a key that survives argument type erasure
//! - **Concurrent** - one `Rewriter` serves any number of loader threads
//! - **Self-contained class file model** - parse, edit and serialize class files without a JVM
//!
//! ## Quick Start
//!
//! ```rust
//! use probeweave::prelude::*;
//!
//! let bytes = ClassFileBuilder::new("com/acme/Pipeline")
//!     .method(MethodBuilder::new("run", "()V").annotation(TASK_MARKER).body(0, 1, vec![0xB1]))
//!     .build()?
//!     .to_bytes()?;
//!
//! let rewriter = Rewriter::default();
//! let request = LoadRequest::new(&NoCompanions, "com/acme/Pipeline", &bytes);
//! let rewritten = rewriter.on_load(&request).expect("marked unit is rewritten");
//!
//! let class = ClassFile::parse(&rewritten)?;
//! assert!(class.find_method("run$tracked", "()V").is_some());
//! # Ok::<(), probeweave::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`classfile`] - class file model: constant pool, members, attributes, builders
//! - [`bytecode`] - opcode table, decoder, assembler and stack map frames
//! - [`engine`] - classification, hook injection, method wrapping and orchestration
//! - [`agent`] - bootstrap from agent arguments into a host transformer registry
//! - [`tracking`] - the in-process tracking facade that rewritten code reports to
//! - [`prelude`] - the commonly used types in one import
//!
//! ## Error Handling
//!
//! Library operations return [`Result`] with the crate's [`Error`]. The rewrite entry points are
//! the exception: they fold every error into a [`engine::RewriteOutcome`] so nothing reaches the
//! host loader.
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use probeweave::prelude::*;
///
/// let config: EngineConfig = "verbose".parse()?;
/// let rewriter = Rewriter::new(config, FacadeBinding::default());
/// assert_eq!(rewriter.stats().snapshot().total(), 0);
/// # Ok::<(), probeweave::Error>(())
/// ```
pub mod prelude;

/// Class file model based on the JVM specification, chapter 4
///
/// [`classfile::ClassFile`] is an owned, editable model of one class. It is parsed from bytes,
/// changed in place and serialized again with [`classfile::ClassFile::to_bytes`]. Unknown
/// attributes are carried through unchanged.
pub mod classfile;

/// JVM bytecode: opcodes, decoding, assembly and stack map frames
///
/// # Examples
///
/// ```rust
/// use probeweave::bytecode::decode_stream;
///
/// let code = [0x2A, 0xB7, 0x00, 0x01, 0xB1]; // aload_0, invokespecial #1, return
/// let instructions = decode_stream(&code)?;
/// assert_eq!(instructions.len(), 3);
/// assert_eq!(instructions[1].mnemonic, "invokespecial");
/// # Ok::<(), probeweave::Error>(())
/// ```
pub mod bytecode;

/// The rewrite engine
pub mod engine;

/// Agent bootstrap
pub mod agent;

/// Reference tracking facade
pub mod tracking;

/// `probeweave` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `probeweave` Error type
///
/// # Examples
///
/// ```rust
/// use probeweave::{classfile::ClassFile, Error};
///
/// match ClassFile::parse(&[0xDE, 0xAD, 0xBE, 0xEF]) {
///     Err(Error::NotSupported) => {}
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub use error::Error;

/// Low-level byte access used by the class file model and the bytecode decoder.
pub use file::{io::ClassIO, parser::Parser, writer::Writer, UnitFile};

pub use classfile::ClassFile;
pub use engine::{RewriteOutcome, Rewriter};

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most variants never reach the host loader: the [`crate::engine::Rewriter`] folds every failure
/// into a [`crate::engine::RewriteOutcome`]. They are visible to callers that drive the lower
/// layers directly, such as the class file parser or the individual rewrite stages.
///
/// # Error Categories
///
/// ## Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid class file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the input
/// - [`Error::NotSupported`] - Input is not a class file
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::InvalidDescriptor`] - A field or method descriptor could not be decoded
///
/// ## Rewrite Errors
/// - [`Error::ConstantPoolOverflow`] - No room left for new constants
/// - [`Error::CodeTooLarge`] - Generated or shifted code exceeds the code size limit
/// - [`Error::MissingCode`] - A marked method has no body to wrap
/// - [`Error::Internal`] - A panic was caught at the engine boundary
///
/// ## Other
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Config`] - Agent arguments could not be interpreted
///
/// # Examples
///
/// ```rust
/// use probeweave::{ClassFile, Error};
///
/// match ClassFile::parse(&[0xDE, 0xAD, 0xBE, 0xEF]) {
///     Err(Error::NotSupported) => println!("not a class file"),
///     Err(e) => println!("other error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The class file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the input.
    #[error("Out of Bound read would have occurred - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The input does not start with the class file magic.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A field or method descriptor could not be decoded.
    #[error("Invalid descriptor - {0}")]
    InvalidDescriptor(String),

    /// The constant pool already holds the maximum number of entries.
    #[error("Constant pool is full, cannot add more entries")]
    ConstantPoolOverflow,

    /// A code array would exceed 65535 bytes.
    #[error("Code of {0} exceeds the maximum code length")]
    CodeTooLarge(String),

    /// A marked method is abstract or native and has no code to wrap.
    #[error("Method {0} has no code attribute")]
    MissingCode(String),

    /// Agent arguments could not be interpreted.
    #[error("Invalid agent argument - {0}")]
    Config(String),

    /// A panic escaped a rewrite stage and was caught at the engine boundary.
    #[error("Internal failure - {0}")]
    Internal(String),
}

//! # Error Types
//!
//! Error handling for the structured value codec.
//!
//! This module defines every error variant that can abort a read or write
//! invocation, from I/O failures in the underlying stream up to schema-level
//! disagreements between a record and its descriptor.
//!
//! ## Error Categories
//! - **Transport Errors**: I/O failure in the stream beneath a port
//! - **Protocol Errors**: Malformed framing (unknown tag, bad count, missing terminator)
//! - **Depth Errors**: Recursion guard tripped on nested input
//! - **Schema Errors**: Values that disagree with their field descriptor
//! - **Configuration Errors**: Invalid or unreadable configuration
//!
//! Every error aborts only the current invocation. The recursion guard is
//! released on every exit path, so a port can be reused after a failure.
//!
//! ## Example Usage
//! ```rust
//! use wire_codec::error::{CodecError, Result};
//!
//! fn check_count(count: i32) -> Result<usize> {
//!     usize::try_from(count)
//!         .map_err(|_| CodecError::Protocol(format!("negative container size: {count}")))
//! }
//!
//! assert!(check_count(-1).is_err());
//! ```

use std::io;
use thiserror::Error;

use crate::core::types::TypeTag;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Framing errors
    pub const ERR_UNKNOWN_TYPE_TAG: &str = "Unknown type tag on the wire";
    pub const ERR_NEGATIVE_SIZE: &str = "Negative size on the wire";
    pub const ERR_UNBALANCED_END: &str = "End call does not match the open frame";
    pub const ERR_CONTAINER_OVERRUN: &str = "More elements read than the container declared";
    pub const ERR_CONTAINER_UNDERRUN: &str = "Container ended before all declared elements were read";
    pub const ERR_TRAILING_BYTES: &str = "Trailing bytes after the top-level struct";

    /// Value errors
    pub const ERR_INVALID_UTF8: &str = "String value is not valid UTF-8";
    pub const ERR_STOP_AS_VALUE: &str = "Stop tag cannot describe a value";

    /// Configuration errors
    pub const ERR_ZERO_DEPTH: &str = "Maximum depth must be greater than 0";
}

/// Coarse classification of a [`CodecError`], used for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    DepthExceeded,
    Schema,
    Config,
}

// CodecError is the primary error type for all codec operations
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Maximum nesting depth exceeded: {depth} > {max}")]
    DepthExceeded { depth: usize, max: usize },

    #[error("Schema mismatch on field '{field}': expected {expected}, found {found}")]
    SchemaMismatch {
        field: String,
        expected: TypeTag,
        found: TypeTag,
    },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Required field '{field}' of '{record}' is not set")]
    MissingRequired { record: String, field: String },

    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CodecError {
    /// Shorthand for a protocol error built from a static message.
    pub fn protocol(msg: &str) -> Self {
        CodecError::Protocol(msg.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Transport(_) => ErrorKind::Transport,
            CodecError::Protocol(_) | CodecError::FrameTooLarge(_) => ErrorKind::Protocol,
            CodecError::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            CodecError::SchemaMismatch { .. }
            | CodecError::UnknownField(_)
            | CodecError::InvalidSchema(_)
            | CodecError::MissingRequired { .. } => ErrorKind::Schema,
            CodecError::ConfigError(_) => ErrorKind::Config,
        }
    }
}

/// Type alias for Results using CodecError
pub type Result<T> = std::result::Result<T, CodecError>;

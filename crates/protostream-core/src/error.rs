//! Error types for the protostream-core library.
//!
//! Every failure is terminal for the decode in which it occurs. Unknown field
//! numbers and unmatched enum values are not errors and never reach this
//! module.

use crate::wire::WireType;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for protostream operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all decode operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A type name or URL could not be resolved to a schema
    #[error("unable to resolve type '{type_url}'")]
    TypeResolution {
        /// The name or URL that failed to resolve
        type_url: String,
    },

    /// The wire type in a tag disagrees with the field's declared kind
    #[error("field '{field}' expects wire type {expected:?}, found {actual:?}")]
    WireTypeMismatch {
        /// Name of the field being decoded
        field: String,
        /// Wire type implied by the field's kind
        expected: WireType,
        /// Wire type carried by the tag
        actual: WireType,
    },

    /// Failed to decode varint
    #[error("malformed varint at offset {offset}")]
    MalformedVarint {
        /// Byte offset where the varint starts
        offset: usize,
    },

    /// The buffer ended in the middle of a value
    #[error("truncated stream at offset {offset}: {needed} more byte(s) required")]
    TruncatedStream {
        /// Byte offset where the read started
        offset: usize,
        /// Number of bytes missing
        needed: usize,
    },

    /// Invalid protobuf wire format
    #[error("invalid protobuf wire format at offset {offset}: {details}")]
    InvalidWireFormat {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// A string field does not hold valid UTF-8
    #[error("field '{field}' contains invalid UTF-8")]
    InvalidUtf8 {
        /// Name of the offending field
        field: String,
    },

    /// Nested messages exceed the configured depth
    #[error(
        "message too deep: max recursion depth {max_depth} reached for type '{type_name}', field '{field_name}'"
    )]
    RecursionLimitExceeded {
        /// Type being entered when the limit was hit
        type_name: String,
        /// Field holding the nested message
        field_name: String,
        /// Configured ceiling
        max_depth: usize,
    },

    /// A well-known type carries a value outside its legal range
    #[error("invalid {type_name} payload: {details}")]
    InvalidWellKnownPayload {
        /// Short name of the well-known type
        type_name: &'static str,
        /// What was wrong with it
        details: String,
    },

    /// The sink refused an event
    #[error("sink rejected event: {0}")]
    SinkRejected(String),

    /// Failed to parse a serialized FileDescriptorSet
    #[error("failed to parse FileDescriptorSet: {0}")]
    DescriptorParse(#[from] prost::DecodeError),

    /// Failed to build a descriptor pool with prost-reflect
    #[error("failed to build descriptor pool: {0}")]
    DescriptorBuild(String),

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Creates a new type resolution error
    pub fn type_resolution(type_url: impl Into<String>) -> Self {
        Self::TypeResolution {
            type_url: type_url.into(),
        }
    }

    /// Creates a new wire type mismatch error
    pub fn wire_type_mismatch(
        field: impl Into<String>,
        expected: WireType,
        actual: WireType,
    ) -> Self {
        Self::WireTypeMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }

    /// Creates a new varint decode error
    pub fn malformed_varint(offset: usize) -> Self {
        Self::MalformedVarint { offset }
    }

    /// Creates a new truncation error
    pub fn truncated(offset: usize, needed: usize) -> Self {
        Self::TruncatedStream { offset, needed }
    }

    /// Creates a new wire format error
    pub fn invalid_wire_format(offset: usize, details: impl Into<String>) -> Self {
        Self::InvalidWireFormat {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new UTF-8 error
    pub fn invalid_utf8(field: impl Into<String>) -> Self {
        Self::InvalidUtf8 {
            field: field.into(),
        }
    }

    /// Creates a new recursion limit error
    pub fn recursion_limit(
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        Self::RecursionLimitExceeded {
            type_name: type_name.into(),
            field_name: field_name.into(),
            max_depth,
        }
    }

    /// Creates a new well-known payload error
    pub fn invalid_well_known(type_name: &'static str, details: impl Into<String>) -> Self {
        Self::InvalidWellKnownPayload {
            type_name,
            details: details.into(),
        }
    }

    /// Creates a new sink rejection error
    pub fn sink_rejected(msg: impl Into<String>) -> Self {
        Self::SinkRejected(msg.into())
    }

    /// Creates a new descriptor build error
    pub fn descriptor_build(msg: impl Into<String>) -> Self {
        Self::DescriptorBuild(msg.into())
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error was caused by the bytes being decoded rather
    /// than by the schema, the sink or the environment
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::WireTypeMismatch { .. }
                | Self::MalformedVarint { .. }
                | Self::TruncatedStream { .. }
                | Self::InvalidWireFormat { .. }
                | Self::InvalidUtf8 { .. }
                | Self::RecursionLimitExceeded { .. }
                | Self::InvalidWellKnownPayload { .. }
        )
    }
}

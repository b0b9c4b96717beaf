//! # protostream-core
//!
//! A schema-reflective decoder for Protocol Buffer wire data.
//!
//! Given a message type known only at runtime and the encoded bytes, the
//! decoder walks the wire format and emits structural events (objects, lists,
//! named scalars) to a caller-supplied sink. No generated code is involved;
//! field numbers, kinds and cardinalities come from runtime schemas.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`wire`]: Tags, varints and the forward-only [`Cursor`](wire::Cursor)
//! - [`codec`]: Raw wire values to logical scalars
//! - [`types`]: Runtime schemas and the [`TypeInfo`] cache
//! - [`decoder`]: The message walk itself
//! - [`well_known`]: Special rendering for `google.protobuf` types
//! - [`sink`] and [`value`]: Event receivers and the in-memory value tree
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use protostream_core::types::{FieldSchema, Kind, SchemaSet, TypeSchema};
//! use protostream_core::{ProtoStreamDecoder, ScalarValue, TypeInfo, Value};
//! use std::sync::Arc;
//!
//! let schemas = SchemaSet::new().with_type(TypeSchema::new(
//!     "demo.Ping",
//!     vec![FieldSchema::new(1, "seq", Kind::Int32)],
//! ));
//! let decoder = ProtoStreamDecoder::new(Arc::new(TypeInfo::new(schemas)));
//!
//! let value = decoder.decode_to_value("type.googleapis.com/demo.Ping", &[0x08, 0x96, 0x01])?;
//! assert_eq!(value.get("seq"), Some(&Value::Scalar(ScalarValue::Int32(150))));
//! # Ok::<(), protostream_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! The library provides several traits for customization:
//!
//! - [`ObjectSink`]: Receive decoded structure
//! - [`TypeResolver`]: Supply schemas from any source
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod decoder;
pub mod error;
pub mod sink;
pub mod types;
pub mod value;
pub mod well_known;
pub mod wire;

#[cfg(test)]
mod testutil;

// Re-export primary types for convenience
pub use decoder::{DecodeContext, DecoderConfig, ProtoStreamDecoder, DEFAULT_MAX_RECURSION_DEPTH};
pub use error::{Error, Result};
pub use sink::{NullSink, ObjectSink, StatsSink};
pub use types::{DescriptorPoolResolver, SchemaSet, TypeInfo, TypeResolver};
pub use value::{ScalarValue, Value, ValueSink};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

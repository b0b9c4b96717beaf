//! Type resolution.
//!
//! [`TypeInfo`] is the read-mostly cache the decoder consults for every nested
//! message and enum. It delegates misses to a [`TypeResolver`], the pluggable
//! lookup service that actually knows the schemas.
//!
//! ## Extensibility
//!
//! Two resolvers ship with the crate:
//!
//! - [`SchemaSet`]: schemas registered by hand
//! - [`DescriptorPoolResolver`]: schemas derived from a `prost-reflect`
//!   descriptor pool
//!
//! ```
//! use protostream_core::types::{FieldSchema, Kind, SchemaSet, TypeInfo, TypeSchema};
//!
//! let schemas = SchemaSet::new().with_type(TypeSchema::new(
//!     "demo.Ping",
//!     vec![FieldSchema::new(1, "seq", Kind::UInt32)],
//! ));
//! let type_info = TypeInfo::new(schemas);
//!
//! let ping = type_info.resolve_type("type.googleapis.com/demo.Ping")?;
//! assert_eq!(type_info.find_field(&ping, 1).unwrap().name, "seq");
//! # Ok::<(), protostream_core::Error>(())
//! ```

mod descriptor;
mod schema;

use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use descriptor::DescriptorPoolResolver;
pub use schema::{Cardinality, EnumSchema, FieldSchema, Kind, TypeSchema};

/// Prefix of canonical type URLs
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Strips any URL prefix and leading dot from a type reference.
///
/// `type.googleapis.com/pkg.Msg`, `.pkg.Msg` and `pkg.Msg` all map to
/// `pkg.Msg`.
pub fn normalize_type_url(type_url: &str) -> &str {
    let name = match type_url.rfind('/') {
        Some(index) => &type_url[index + 1..],
        None => type_url,
    };
    name.trim_start_matches('.')
}

/// Builds the canonical type URL for a fully qualified name
pub fn type_url_for(full_name: &str) -> String {
    format!("{}{}", TYPE_URL_PREFIX, normalize_type_url(full_name))
}

/// Lookup service mapping fully qualified names to schemas.
///
/// Names passed in are already normalized (no URL prefix, no leading dot).
pub trait TypeResolver: Send + Sync {
    /// Resolve a message type
    fn resolve_type(&self, full_name: &str) -> Option<TypeSchema>;

    /// Resolve an enum type
    fn resolve_enum(&self, full_name: &str) -> Option<EnumSchema>;
}

/// In-memory resolver populated with explicit schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    types: HashMap<String, TypeSchema>,
    enums: HashMap<String, EnumSchema>,
}

impl SchemaSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message type
    pub fn with_type(mut self, schema: TypeSchema) -> Self {
        self.insert_type(schema);
        self
    }

    /// Adds an enum type
    pub fn with_enum(mut self, schema: EnumSchema) -> Self {
        self.insert_enum(schema);
        self
    }

    /// Adds a message type in place
    pub fn insert_type(&mut self, schema: TypeSchema) {
        self.types
            .insert(normalize_type_url(schema.name()).to_string(), schema);
    }

    /// Adds an enum type in place
    pub fn insert_enum(&mut self, schema: EnumSchema) {
        self.enums
            .insert(normalize_type_url(schema.name()).to_string(), schema);
    }
}

impl TypeResolver for SchemaSet {
    fn resolve_type(&self, full_name: &str) -> Option<TypeSchema> {
        self.types.get(full_name).cloned()
    }

    fn resolve_enum(&self, full_name: &str) -> Option<EnumSchema> {
        self.enums.get(full_name).cloned()
    }
}

/// Memoizing, thread-safe front for a [`TypeResolver`]
pub struct TypeInfo {
    resolver: Box<dyn TypeResolver>,
    types: RwLock<HashMap<String, Arc<TypeSchema>>>,
    enums: RwLock<HashMap<String, Arc<EnumSchema>>>,
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("cached_types", &self.types.read().len())
            .field("cached_enums", &self.enums.read().len())
            .finish_non_exhaustive()
    }
}

impl TypeInfo {
    /// Creates a cache in front of `resolver`
    pub fn new(resolver: impl TypeResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            types: RwLock::new(HashMap::new()),
            enums: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves a message type by name or URL
    pub fn resolve_type(&self, type_url: &str) -> Result<Arc<TypeSchema>> {
        let name = normalize_type_url(type_url);
        resolve_cached(&self.types, name, |n| self.resolver.resolve_type(n))
            .ok_or_else(|| Error::type_resolution(type_url))
    }

    /// Resolves an enum type by name or URL
    pub fn resolve_enum(&self, type_url: &str) -> Result<Arc<EnumSchema>> {
        let name = normalize_type_url(type_url);
        resolve_cached(&self.enums, name, |n| self.resolver.resolve_enum(n))
            .ok_or_else(|| Error::type_resolution(type_url))
    }

    /// Looks up a field of `schema` by number
    pub fn find_field<'s>(&self, schema: &'s TypeSchema, number: u32) -> Option<&'s FieldSchema> {
        schema.field(number)
    }

    /// Number of message types currently cached
    pub fn cached_types(&self) -> usize {
        self.types.read().len()
    }
}

fn resolve_cached<T>(
    cache: &RwLock<HashMap<String, Arc<T>>>,
    name: &str,
    resolve: impl FnOnce(&str) -> Option<T>,
) -> Option<Arc<T>> {
    if let Some(hit) = cache.read().get(name) {
        return Some(Arc::clone(hit));
    }

    debug!("Type cache miss for {}", name);
    // The resolver runs unlocked; a concurrent miss on the same name keeps
    // whichever entry was inserted first.
    let resolved = Arc::new(resolve(name)?);
    let mut cache = cache.write();
    let entry = cache.entry(name.to_string()).or_insert(resolved);
    Some(Arc::clone(entry))
}

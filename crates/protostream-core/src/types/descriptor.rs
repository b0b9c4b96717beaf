//! Resolver backed by a `prost-reflect` descriptor pool.

use super::schema::{Cardinality, EnumSchema, FieldSchema, Kind, TypeSchema};
use super::{type_url_for, TypeResolver};
use crate::error::{Error, Result};
use prost::Message;
use prost_reflect::{DescriptorPool, FieldDescriptor, Kind as ReflectKind, MessageDescriptor};
use prost_types::FileDescriptorSet;
use std::path::Path;
use tracing::debug;

/// Serves schemas out of a [`DescriptorPool`].
///
/// Field names are the descriptor's JSON names (`book_title` becomes
/// `bookTitle`).
#[derive(Debug, Clone)]
pub struct DescriptorPoolResolver {
    pool: DescriptorPool,
}

impl DescriptorPoolResolver {
    /// Wraps an existing pool
    pub fn from_pool(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    /// Builds a pool from a serialized `FileDescriptorSet`, as written by
    /// `protoc --include_imports -o`
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let set = FileDescriptorSet::decode(data)?;
        Self::from_file_descriptor_set(set)
    }

    /// Builds a pool from a decoded `FileDescriptorSet`
    pub fn from_file_descriptor_set(set: FileDescriptorSet) -> Result<Self> {
        let files = set.file.len();
        let pool = DescriptorPool::from_file_descriptor_set(set)
            .map_err(|e| Error::descriptor_build(e.to_string()))?;
        debug!("Built descriptor pool from {} file(s)", files);
        Ok(Self { pool })
    }

    /// Reads and builds a serialized `FileDescriptorSet` from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_bytes(&data)
    }

    /// The underlying pool
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }
}

impl TypeResolver for DescriptorPoolResolver {
    fn resolve_type(&self, full_name: &str) -> Option<TypeSchema> {
        self.pool
            .get_message_by_name(full_name)
            .map(|message| convert_message(&message))
    }

    fn resolve_enum(&self, full_name: &str) -> Option<EnumSchema> {
        self.pool.get_enum_by_name(full_name).map(|descriptor| {
            EnumSchema::new(
                descriptor.full_name(),
                descriptor
                    .values()
                    .map(|value| (value.number(), value.name().to_string())),
            )
        })
    }
}

fn convert_message(message: &MessageDescriptor) -> TypeSchema {
    TypeSchema::new(
        message.full_name(),
        message.fields().map(|field| convert_field(&field)).collect(),
    )
}

fn convert_field(field: &FieldDescriptor) -> FieldSchema {
    let (kind, type_url) = match field.kind() {
        ReflectKind::Double => (Kind::Double, None),
        ReflectKind::Float => (Kind::Float, None),
        ReflectKind::Int32 => (Kind::Int32, None),
        ReflectKind::Int64 => (Kind::Int64, None),
        ReflectKind::Uint32 => (Kind::UInt32, None),
        ReflectKind::Uint64 => (Kind::UInt64, None),
        ReflectKind::Sint32 => (Kind::SInt32, None),
        ReflectKind::Sint64 => (Kind::SInt64, None),
        ReflectKind::Fixed32 => (Kind::Fixed32, None),
        ReflectKind::Fixed64 => (Kind::Fixed64, None),
        ReflectKind::Sfixed32 => (Kind::SFixed32, None),
        ReflectKind::Sfixed64 => (Kind::SFixed64, None),
        ReflectKind::Bool => (Kind::Bool, None),
        ReflectKind::String => (Kind::String, None),
        ReflectKind::Bytes => (Kind::Bytes, None),
        ReflectKind::Enum(descriptor) => (Kind::Enum, Some(type_url_for(descriptor.full_name()))),
        ReflectKind::Message(descriptor) => {
            let kind = if field.is_group() { Kind::Group } else { Kind::Message };
            (kind, Some(type_url_for(descriptor.full_name())))
        }
    };

    let cardinality = if field.is_list() || field.is_map() {
        Cardinality::Repeated
    } else {
        Cardinality::Optional
    };

    FieldSchema {
        number: field.number(),
        name: field.json_name().to_string(),
        kind,
        cardinality,
        type_url,
        packed: field.is_packed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FileDescriptorProto, MessageOptions,
    };

    fn field(name: &str, number: i32, label: Label, ty: Type, type_name: Option<&str>) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(label as i32),
            r#type: Some(ty as i32),
            type_name: type_name.map(str::to_string),
            ..Default::default()
        }
    }

    fn library_set() -> FileDescriptorSet {
        let entry = DescriptorProto {
            name: Some("AttrsEntry".to_string()),
            field: vec![
                field("key", 1, Label::Optional, Type::String, None),
                field("value", 2, Label::Optional, Type::Int64, None),
            ],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let book = DescriptorProto {
            name: Some("Book".to_string()),
            field: vec![
                field("book_title", 1, Label::Optional, Type::String, None),
                field("genre", 2, Label::Optional, Type::Enum, Some(".library.Genre")),
                field("page_counts", 3, Label::Repeated, Type::Int32, None),
                field("attrs", 4, Label::Repeated, Type::Message, Some(".library.Book.AttrsEntry")),
                field("sequel", 5, Label::Optional, Type::Message, Some(".library.Book")),
            ],
            nested_type: vec![entry],
            ..Default::default()
        };

        let genre = EnumDescriptorProto {
            name: Some("Genre".to_string()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("GENRE_UNSPECIFIED".to_string()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("ACTION_AND_ADVENTURE".to_string()),
                    number: Some(1),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("library.proto".to_string()),
                package: Some("library".to_string()),
                syntax: Some("proto3".to_string()),
                message_type: vec![book],
                enum_type: vec![genre],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_convert_message_fields() {
        let resolver = DescriptorPoolResolver::from_file_descriptor_set(library_set()).unwrap();
        let book = resolver.resolve_type("library.Book").unwrap();

        assert_eq!(book.name(), "library.Book");
        let names: Vec<&str> = book.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["bookTitle", "genre", "pageCounts", "attrs", "sequel"]);

        let pages = book.field(3).unwrap();
        assert_eq!(pages.kind, Kind::Int32);
        assert!(pages.is_repeated());
        assert!(pages.packed);

        let genre = book.field(2).unwrap();
        assert_eq!(genre.kind, Kind::Enum);
        assert_eq!(genre.type_url(), "type.googleapis.com/library.Genre");

        let sequel = book.field(5).unwrap();
        assert_eq!(sequel.kind, Kind::Message);
        assert!(!sequel.is_repeated());
    }

    #[test]
    fn test_map_entry_is_structural() {
        let resolver = DescriptorPoolResolver::from_file_descriptor_set(library_set()).unwrap();
        let book = resolver.resolve_type("library.Book").unwrap();
        let attrs = book.field(4).unwrap();
        assert!(attrs.is_repeated());

        let entry = resolver
            .resolve_type(super::super::normalize_type_url(attrs.type_url()))
            .unwrap();
        assert!(entry.is_map_entry());
    }

    #[test]
    fn test_resolve_enum() {
        let resolver = DescriptorPoolResolver::from_file_descriptor_set(library_set()).unwrap();
        let genre = resolver.resolve_enum("library.Genre").unwrap();
        assert_eq!(genre.name_of(1), Some("ACTION_AND_ADVENTURE"));
        assert!(resolver.resolve_enum("library.Mood").is_none());
    }

    #[test]
    fn test_from_bytes() {
        let bytes = library_set().encode_to_vec();
        let resolver = DescriptorPoolResolver::from_bytes(&bytes).unwrap();
        assert!(resolver.pool().get_message_by_name("library.Book").is_some());

        assert!(DescriptorPoolResolver::from_bytes(&[0xFF, 0xFF]).is_err());
    }
}

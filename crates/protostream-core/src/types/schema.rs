//! Runtime schema model.
//!
//! Schemas reference nested message and enum types by type URL rather than by
//! ownership, so self-referential and mutually recursive types are plain data.

use std::collections::HashMap;

/// Declared kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    UInt32,
    /// `uint64`
    UInt64,
    /// `sint32` (zigzag)
    SInt32,
    /// `sint64` (zigzag)
    SInt64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    SFixed32,
    /// `sfixed64`
    SFixed64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// Enum, named by the field's type URL
    Enum,
    /// Length-delimited message, named by the field's type URL
    Message,
    /// Proto2 group, named by the field's type URL
    Group,
}

impl Kind {
    /// Returns true for kinds that may be encoded packed
    pub fn is_packable(&self) -> bool {
        !matches!(self, Kind::String | Kind::Bytes | Kind::Message | Kind::Group)
    }

    /// Returns true for kinds decoded by walking a nested schema
    pub fn is_message(&self) -> bool {
        matches!(self, Kind::Message | Kind::Group)
    }

    /// Returns true for kinds allowed as map keys: integers, bool and string
    pub fn is_map_key(&self) -> bool {
        !matches!(
            self,
            Kind::Float | Kind::Double | Kind::Bytes | Kind::Enum | Kind::Message | Kind::Group
        )
    }
}

/// Field cardinality. Proto2 `required` is treated as optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cardinality {
    /// Singular field
    #[default]
    Optional,
    /// Repeated field (including maps)
    Repeated,
}

/// Descriptor of a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Field number, unique within its message
    pub number: u32,
    /// Name used for emitted events
    pub name: String,
    /// Declared kind
    pub kind: Kind,
    /// Singular or repeated
    pub cardinality: Cardinality,
    /// Nested type for enum, message and group kinds
    pub type_url: Option<String>,
    /// Whether the field is declared packed
    pub packed: bool,
}

impl FieldSchema {
    /// Creates an optional scalar field
    pub fn new(number: u32, name: impl Into<String>, kind: Kind) -> Self {
        Self {
            number,
            name: name.into(),
            kind,
            cardinality: Cardinality::Optional,
            type_url: None,
            packed: false,
        }
    }

    /// Creates an optional message field
    pub fn message(number: u32, name: impl Into<String>, type_url: impl Into<String>) -> Self {
        Self::new(number, name, Kind::Message).with_type_url(type_url)
    }

    /// Creates an optional enum field
    pub fn enumeration(number: u32, name: impl Into<String>, type_url: impl Into<String>) -> Self {
        Self::new(number, name, Kind::Enum).with_type_url(type_url)
    }

    /// Sets the nested type URL
    pub fn with_type_url(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = Some(type_url.into());
        self
    }

    /// Marks the field repeated
    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    /// Marks the field repeated and packed
    pub fn packed(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self.packed = true;
        self
    }

    /// Returns true if the field is repeated
    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// The nested type URL, or an empty string for scalar fields
    pub fn type_url(&self) -> &str {
        self.type_url.as_deref().unwrap_or_default()
    }
}

/// Descriptor of a message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    name: String,
    fields: Vec<FieldSchema>,
    by_number: HashMap<u32, usize>,
}

impl TypeSchema {
    /// Creates a schema. When two fields share a number the first one wins.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        let mut by_number = HashMap::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            by_number.entry(field.number).or_insert(index);
        }
        Self {
            name: name.into(),
            fields,
            by_number,
        }
    }

    /// Fully qualified type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Looks up a field by number
    pub fn field(&self, number: u32) -> Option<&FieldSchema> {
        self.by_number.get(&number).map(|&index| &self.fields[index])
    }

    /// Returns true if this type has the shape of a map entry: exactly a
    /// singular `key` = 1 of a map-key kind and a singular `value` = 2.
    pub fn is_map_entry(&self) -> bool {
        if self.fields.len() != 2 {
            return false;
        }
        let is_slot = |number: u32, name: &str| {
            self.field(number)
                .filter(|f| f.name == name && !f.is_repeated())
        };
        let key = is_slot(1, "key").map_or(false, |f| f.kind.is_map_key());
        key && is_slot(2, "value").is_some()
    }
}

/// Descriptor of an enum type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    name: String,
    values: Vec<(i32, String)>,
}

impl EnumSchema {
    /// Creates an enum schema from `(number, name)` pairs
    pub fn new<N: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = (i32, N)>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(|(n, v)| (n, v.into())).collect(),
        }
    }

    /// Fully qualified enum name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the first value declared with `number`
    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, name)| name.as_str())
    }
}

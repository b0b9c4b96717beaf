//! Conversion of raw wire values into logical scalars.
//!
//! Numeric conversions follow the protobuf encoding rules exactly; nothing is
//! coerced across wire types.

use crate::error::{Error, Result};
use crate::types::{EnumSchema, Kind};
use crate::value::ScalarValue;
use crate::wire::{RawValue, WireType};
use bytes::Bytes;

/// Wire type implied by a field kind when it is not packed
pub fn expected_wire_type(kind: Kind) -> WireType {
    match kind {
        Kind::Int32
        | Kind::Int64
        | Kind::UInt32
        | Kind::UInt64
        | Kind::SInt32
        | Kind::SInt64
        | Kind::Bool
        | Kind::Enum => WireType::Varint,
        Kind::Fixed64 | Kind::SFixed64 | Kind::Double => WireType::I64,
        Kind::Fixed32 | Kind::SFixed32 | Kind::Float => WireType::I32,
        Kind::String | Kind::Bytes | Kind::Message => WireType::Len,
        Kind::Group => WireType::StartGroup,
    }
}

/// Decodes a raw value as `kind`.
///
/// Enums decode to their number as `Int32`; use [`decode_enum`] to attach a
/// name. `field` is only used in error messages.
pub fn decode_scalar(field: &str, kind: Kind, raw: RawValue<'_>, strict_utf8: bool) -> Result<ScalarValue> {
    let expected = expected_wire_type(kind);
    let value = match (kind, raw) {
        (Kind::Int32 | Kind::Enum, RawValue::Varint(v)) => ScalarValue::Int32(v as i32),
        (Kind::Int64, RawValue::Varint(v)) => ScalarValue::Int64(v as i64),
        (Kind::UInt32, RawValue::Varint(v)) => ScalarValue::UInt32(v as u32),
        (Kind::UInt64, RawValue::Varint(v)) => ScalarValue::UInt64(v),
        (Kind::SInt32, RawValue::Varint(v)) => ScalarValue::Int32(zigzag32(v as u32)),
        (Kind::SInt64, RawValue::Varint(v)) => ScalarValue::Int64(zigzag64(v)),
        (Kind::Bool, RawValue::Varint(v)) => ScalarValue::Bool(v != 0),
        (Kind::Fixed32, RawValue::Fixed32(v)) => ScalarValue::UInt32(v),
        (Kind::SFixed32, RawValue::Fixed32(v)) => ScalarValue::Int32(v as i32),
        (Kind::Float, RawValue::Fixed32(v)) => ScalarValue::Float(f32::from_bits(v)),
        (Kind::Fixed64, RawValue::Fixed64(v)) => ScalarValue::UInt64(v),
        (Kind::SFixed64, RawValue::Fixed64(v)) => ScalarValue::Int64(v as i64),
        (Kind::Double, RawValue::Fixed64(v)) => ScalarValue::Double(f64::from_bits(v)),
        (Kind::String, RawValue::LengthDelimited(data)) => {
            ScalarValue::String(decode_string(field, data, strict_utf8)?)
        }
        (Kind::Bytes, RawValue::LengthDelimited(data)) => ScalarValue::Bytes(Bytes::copy_from_slice(data)),
        (_, raw) => return Err(Error::wire_type_mismatch(field, expected, raw.wire_type())),
    };
    Ok(value)
}

/// Decodes UTF-8, failing in strict mode and replacing invalid sequences
/// otherwise
pub fn decode_string(field: &str, data: &[u8], strict: bool) -> Result<String> {
    if strict {
        std::str::from_utf8(data)
            .map(str::to_string)
            .map_err(|_| Error::invalid_utf8(field))
    } else {
        Ok(String::from_utf8_lossy(data).into_owned())
    }
}

/// Renders an enum number through its value table.
///
/// Numbers without a declared name fall back to `Int32`.
pub fn decode_enum(number: i32, schema: &EnumSchema, lower_camel: bool) -> ScalarValue {
    match schema.name_of(number) {
        Some(name) if lower_camel => ScalarValue::Enum(enum_name_to_lower_camel(name)),
        Some(name) => ScalarValue::Enum(name.to_string()),
        None => ScalarValue::Int32(number),
    }
}

/// Value of a field of `kind` that is absent from the wire
pub fn default_scalar(kind: Kind) -> ScalarValue {
    match kind {
        Kind::Int32 | Kind::SInt32 | Kind::SFixed32 | Kind::Enum => ScalarValue::Int32(0),
        Kind::Int64 | Kind::SInt64 | Kind::SFixed64 => ScalarValue::Int64(0),
        Kind::UInt32 | Kind::Fixed32 => ScalarValue::UInt32(0),
        Kind::UInt64 | Kind::Fixed64 => ScalarValue::UInt64(0),
        Kind::Float => ScalarValue::Float(0.0),
        Kind::Double => ScalarValue::Double(0.0),
        Kind::Bool => ScalarValue::Bool(false),
        Kind::String => ScalarValue::String(String::new()),
        Kind::Bytes => ScalarValue::Bytes(Bytes::new()),
        Kind::Message | Kind::Group => ScalarValue::Null,
    }
}

fn zigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

fn zigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Convert a snake_case name to lowerCamelCase
pub(crate) fn to_lower_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Convert an UPPER_SNAKE_CASE enum value name to lowerCamelCase
pub(crate) fn enum_name_to_lower_camel(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for (i, word) in s.split('_').filter(|w| !w.is_empty()).enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                result.push(first.to_ascii_lowercase());
            } else {
                result.push(first.to_ascii_uppercase());
            }
            result.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }

    result
}

//! Special rendering for the `google.protobuf` well-known types.
//!
//! A renderer replaces the generic field walk for its type and owns the
//! framing of whatever it emits. Renderers only apply to length-delimited
//! messages and to the top-level message of a decode.

use crate::codec;
use crate::decoder::{DecodeContext, ProtoStreamDecoder};
use crate::error::{Error, Result};
use crate::sink::ObjectSink;
use crate::types::{normalize_type_url, Kind};
use crate::value::ScalarValue;
use crate::wire::{Cursor, WireTag, WireType};
use chrono::{DateTime, SecondsFormat};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::trace;

/// Renders one well-known message read from a cursor positioned at its
/// first field
pub type Renderer =
    fn(&ProtoStreamDecoder, &mut DecodeContext, &mut Cursor<'_>, &str, &mut dyn ObjectSink) -> Result<()>;

const TIMESTAMP: &str = "google.protobuf.Timestamp";
const DURATION: &str = "google.protobuf.Duration";
const STRUCT: &str = "google.protobuf.Struct";
const VALUE: &str = "google.protobuf.Value";
const LIST_VALUE: &str = "google.protobuf.ListValue";
const ANY: &str = "google.protobuf.Any";

/// Earliest representable timestamp, 0001-01-01T00:00:00Z
const TIMESTAMP_MIN_SECONDS: i64 = -62_135_596_800;
/// Latest representable timestamp, 9999-12-31T23:59:59Z
const TIMESTAMP_MAX_SECONDS: i64 = 253_402_300_799;
/// Roughly 10,000 years
const DURATION_MAX_SECONDS: i64 = 315_576_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Returns the renderer registered for `type_url`, if any.
///
/// Accepts the same spellings as [`normalize_type_url`]; the table is keyed
/// by fully qualified name so lookups do not allocate.
pub fn lookup(type_url: &str) -> Option<Renderer> {
    renderers().get(normalize_type_url(type_url)).copied()
}

/// Returns true if `type_url` names a type with special rendering
pub fn is_well_known(type_url: &str) -> bool {
    lookup(type_url).is_some()
}

fn renderers() -> &'static HashMap<&'static str, Renderer> {
    static RENDERERS: OnceLock<HashMap<&'static str, Renderer>> = OnceLock::new();

    RENDERERS.get_or_init(|| {
        let entries: [(&'static str, Renderer); 16] = [
            ("google.protobuf.Timestamp", render_timestamp),
            ("google.protobuf.Duration", render_duration),
            ("google.protobuf.DoubleValue", render_double_value),
            ("google.protobuf.FloatValue", render_float_value),
            ("google.protobuf.Int64Value", render_int64_value),
            ("google.protobuf.UInt64Value", render_uint64_value),
            ("google.protobuf.Int32Value", render_int32_value),
            ("google.protobuf.UInt32Value", render_uint32_value),
            ("google.protobuf.BoolValue", render_bool_value),
            ("google.protobuf.StringValue", render_string_value),
            ("google.protobuf.BytesValue", render_bytes_value),
            ("google.protobuf.Struct", render_struct),
            ("google.protobuf.Value", render_value),
            ("google.protobuf.ListValue", render_list_value),
            ("google.protobuf.Any", render_any),
            ("google.protobuf.FieldMask", render_field_mask),
        ];
        entries.into_iter().collect()
    })
}

fn expect_wire_type(tag: WireTag, expected: WireType, field: &str) -> Result<()> {
    if tag.wire_type == expected {
        Ok(())
    } else {
        Err(Error::wire_type_mismatch(field, expected, tag.wire_type))
    }
}

/// Reads the `seconds` and `nanos` fields shared by Timestamp and Duration
fn read_seconds_and_nanos(cursor: &mut Cursor<'_>) -> Result<(i64, i32)> {
    let mut seconds = 0i64;
    let mut nanos = 0i32;

    while let Some(tag) = cursor.read_tag()? {
        match tag.field_number {
            1 => {
                expect_wire_type(tag, WireType::Varint, "seconds")?;
                seconds = cursor.read_varint()? as i64;
            }
            2 => {
                expect_wire_type(tag, WireType::Varint, "nanos")?;
                nanos = cursor.read_varint()? as i32;
            }
            _ => {
                cursor.skip_field(tag)?;
            }
        }
    }
    Ok((seconds, nanos))
}

fn render_timestamp(
    _decoder: &ProtoStreamDecoder,
    _ctx: &mut DecodeContext,
    cursor: &mut Cursor<'_>,
    name: &str,
    sink: &mut dyn ObjectSink,
) -> Result<()> {
    let (seconds, nanos) = read_seconds_and_nanos(cursor)?;
    sink.render_field(name, ScalarValue::String(format_timestamp(seconds, nanos)?))
}

/// Formats a timestamp as RFC 3339 in UTC with 0, 3, 6 or 9 fraction digits
pub(crate) fn format_timestamp(seconds: i64, nanos: i32) -> Result<String> {
    if !(TIMESTAMP_MIN_SECONDS..=TIMESTAMP_MAX_SECONDS).contains(&seconds) {
        return Err(Error::invalid_well_known(
            TIMESTAMP,
            format!("seconds {} outside 0001-01-01 to 9999-12-31", seconds),
        ));
    }
    if !(0..NANOS_PER_SECOND).contains(&i64::from(nanos)) {
        return Err(Error::invalid_well_known(TIMESTAMP, format!("nanos {} outside [0, 1e9)", nanos)));
    }

    let datetime = DateTime::from_timestamp(seconds, nanos as u32)
        .ok_or_else(|| Error::invalid_well_known(TIMESTAMP, format!("{}.{:09} is not representable", seconds, nanos)))?;
    Ok(datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn render_duration(
    _decoder: &ProtoStreamDecoder,
    _ctx: &mut DecodeContext,
    cursor: &mut Cursor<'_>,
    name: &str,
    sink: &mut dyn ObjectSink,
) -> Result<()> {
    let (seconds, nanos) = read_seconds_and_nanos(cursor)?;
    sink.render_field(name, ScalarValue::String(format_duration(seconds, nanos)?))
}

/// Formats a duration as `<seconds>.<nanos:09>s` with a single leading sign
pub(crate) fn format_duration(seconds: i64, nanos: i32) -> Result<String> {
    if !(-DURATION_MAX_SECONDS..=DURATION_MAX_SECONDS).contains(&seconds) {
        return Err(Error::invalid_well_known(DURATION, format!("seconds {} out of range", seconds)));
    }
    if i64::from(nanos).abs() >= NANOS_PER_SECOND {
        return Err(Error::invalid_well_known(DURATION, format!("nanos {} out of range", nanos)));
    }
    if (seconds < 0 && nanos > 0) || (seconds > 0 && nanos < 0) {
        return Err(Error::invalid_well_known(
            DURATION,
            format!("seconds {} and nanos {} have opposite signs", seconds, nanos),
        ));
    }

    let sign = if seconds < 0 || nanos < 0 { "-" } else { "" };
    Ok(format!("{}{}.{:09}s", sign, seconds.unsigned_abs(), nanos.unsigned_abs()))
}

/// Renders a wrapper message as the bare scalar in its field 1
fn render_wrapper(
    ctx: &DecodeContext,
    cursor: &mut Cursor<'_>,
    kind: Kind,
    name: &str,
    sink: &mut dyn ObjectSink,
) -> Result<()> {
    let mut value = codec::default_scalar(kind);
    let expected = codec::expected_wire_type(kind);

    while let Some(tag) = cursor.read_tag()? {
        if tag.field_number != 1 {
            cursor.skip_field(tag)?;
            continue;
        }
        expect_wire_type(tag, expected, "value")?;
        let raw = cursor.read_raw(expected)?;
        value = codec::decode_scalar("value", kind, raw, ctx.strict_utf8)?;
    }

    sink.render_field(name, value)
}

macro_rules! wrapper_renderers {
    ($($fn_name:ident => $kind:expr),* $(,)?) => {
        $(
            fn $fn_name(
                _decoder: &ProtoStreamDecoder,
                ctx: &mut DecodeContext,
                cursor: &mut Cursor<'_>,
                name: &str,
                sink: &mut dyn ObjectSink,
            ) -> Result<()> {
                render_wrapper(ctx, cursor, $kind, name, sink)
            }
        )*
    };
}

wrapper_renderers! {
    render_double_value => Kind::Double,
    render_float_value => Kind::Float,
    render_int64_value => Kind::Int64,
    render_uint64_value => Kind::UInt64,
    render_int32_value => Kind::Int32,
    render_uint32_value => Kind::UInt32,
    render_bool_value => Kind::Bool,
    render_string_value => Kind::String,
    render_bytes_value => Kind::Bytes,
}

fn render_struct(
    decoder: &ProtoStreamDecoder,
    ctx: &mut DecodeContext,
    cursor: &mut Cursor<'_>,
    name: &str,
    sink: &mut dyn ObjectSink,
) -> Result<()> {
    let mut entries: Vec<(String, Option<Cursor<'_>>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    while let Some(tag) = cursor.read_tag()? {
        if tag.field_number != 1 {
            cursor.skip_field(tag)?;
            continue;
        }
        expect_wire_type(tag, WireType::Len, "fields")?;
        let mut entry = cursor.read_nested()?;
        let (key, value) = read_struct_entry(ctx, &mut entry)?;

        match positions.get(&key) {
            Some(&index) => entries[index].1 = value,
            None => {
                positions.insert(key.clone(), entries.len());
                entries.push((key, value));
            }
        }
    }

    sink.start_object(name)?;
    for (key, value) in entries.iter_mut() {
        match value {
            Some(value) => render_value(decoder, ctx, value, key, sink)?,
            None => sink.render_null(key)?,
        }
    }
    sink.end_object()
}

/// Reads one `fields` map entry, keeping the value undecoded
fn read_struct_entry<'a>(ctx: &DecodeContext, entry: &mut Cursor<'a>) -> Result<(String, Option<Cursor<'a>>)> {
    let mut key = String::new();
    let mut value = None;

    while let Some(tag) = entry.read_tag()? {
        match tag.field_number {
            1 => {
                expect_wire_type(tag, WireType::Len, "key")?;
                key = codec::decode_string("key", entry.read_length_delimited()?, ctx.strict_utf8)?;
            }
            2 => {
                expect_wire_type(tag, WireType::Len, "value")?;
                value = Some(entry.read_nested()?);
            }
            _ => {
                entry.skip_field(tag)?;
            }
        }
    }
    Ok((key, value))
}

/// The `kind` oneof of a `google.protobuf.Value`
enum ValueKind<'a> {
    Null,
    Number(f64),
    String(&'a [u8]),
    Bool(bool),
    Struct(Cursor<'a>),
    List(Cursor<'a>),
}

fn render_value(
    decoder: &ProtoStreamDecoder,
    ctx: &mut DecodeContext,
    cursor: &mut Cursor<'_>,
    name: &str,
    sink: &mut dyn ObjectSink,
) -> Result<()> {
    let mut kind = ValueKind::Null;

    while let Some(tag) = cursor.read_tag()? {
        kind = match tag.field_number {
            1 => {
                expect_wire_type(tag, WireType::Varint, "null_value")?;
                cursor.read_varint()?;
                ValueKind::Null
            }
            2 => {
                expect_wire_type(tag, WireType::I64, "number_value")?;
                ValueKind::Number(f64::from_bits(cursor.read_fixed64()?))
            }
            3 => {
                expect_wire_type(tag, WireType::Len, "string_value")?;
                ValueKind::String(cursor.read_length_delimited()?)
            }
            4 => {
                expect_wire_type(tag, WireType::Varint, "bool_value")?;
                ValueKind::Bool(cursor.read_varint()? != 0)
            }
            5 => {
                expect_wire_type(tag, WireType::Len, "struct_value")?;
                ValueKind::Struct(cursor.read_nested()?)
            }
            6 => {
                expect_wire_type(tag, WireType::Len, "list_value")?;
                ValueKind::List(cursor.read_nested()?)
            }
            _ => {
                cursor.skip_field(tag)?;
                continue;
            }
        };
    }

    match kind {
        ValueKind::Null => sink.render_null(name),
        ValueKind::Number(v) => sink.render_field(name, ScalarValue::Double(v)),
        ValueKind::String(data) => {
            let value = codec::decode_string("string_value", data, ctx.strict_utf8)?;
            sink.render_field(name, ScalarValue::String(value))
        }
        ValueKind::Bool(v) => sink.render_field(name, ScalarValue::Bool(v)),
        ValueKind::Struct(mut nested) => ctx.within(STRUCT, "struct_value", |ctx| {
            render_struct(decoder, ctx, &mut nested, name, sink)
        }),
        ValueKind::List(mut nested) => ctx.within(LIST_VALUE, "list_value", |ctx| {
            render_list_value(decoder, ctx, &mut nested, name, sink)
        }),
    }
}

fn render_list_value(
    decoder: &ProtoStreamDecoder,
    ctx: &mut DecodeContext,
    cursor: &mut Cursor<'_>,
    name: &str,
    sink: &mut dyn ObjectSink,
) -> Result<()> {
    sink.start_list(name)?;
    while let Some(tag) = cursor.read_tag()? {
        if tag.field_number != 1 {
            cursor.skip_field(tag)?;
            continue;
        }
        expect_wire_type(tag, WireType::Len, "values")?;
        let mut element = cursor.read_nested()?;
        ctx.within(VALUE, "values", |ctx| render_value(decoder, ctx, &mut element, "", sink))?;
    }
    sink.end_list()
}

fn render_any(
    decoder: &ProtoStreamDecoder,
    ctx: &mut DecodeContext,
    cursor: &mut Cursor<'_>,
    name: &str,
    sink: &mut dyn ObjectSink,
) -> Result<()> {
    let mut type_url = String::new();
    let mut value: Option<Cursor<'_>> = None;

    while let Some(tag) = cursor.read_tag()? {
        match tag.field_number {
            1 => {
                expect_wire_type(tag, WireType::Len, "type_url")?;
                type_url = codec::decode_string("type_url", cursor.read_length_delimited()?, ctx.strict_utf8)?;
            }
            2 => {
                expect_wire_type(tag, WireType::Len, "value")?;
                value = Some(cursor.read_nested()?);
            }
            _ => {
                cursor.skip_field(tag)?;
            }
        }
    }

    let mut value = value.filter(|v| !v.is_at_end());

    let Some(payload) = value.as_mut() else {
        sink.start_object(name)?;
        if !type_url.is_empty() {
            sink.render_field("@type", ScalarValue::String(type_url))?;
        }
        return sink.end_object();
    };
    if type_url.is_empty() {
        return Err(Error::invalid_well_known(ANY, "value present without a type URL"));
    }

    trace!("Rendering Any payload of {}", type_url);

    if let Some(renderer) = lookup(&type_url) {
        sink.start_object(name)?;
        sink.render_field("@type", ScalarValue::String(type_url.clone()))?;
        ctx.within(ANY, "value", |ctx| renderer(decoder, ctx, payload, "value", sink))?;
        return sink.end_object();
    }

    let schema = decoder.type_info().resolve_type(&type_url)?;
    sink.start_object(name)?;
    sink.render_field("@type", ScalarValue::String(type_url.clone()))?;
    ctx.within(schema.name(), "value", |ctx| {
        decoder.write_message(ctx, payload, &schema, "", None, false, sink)
    })?;
    sink.end_object()
}

fn render_field_mask(
    _decoder: &ProtoStreamDecoder,
    ctx: &mut DecodeContext,
    cursor: &mut Cursor<'_>,
    name: &str,
    sink: &mut dyn ObjectSink,
) -> Result<()> {
    let mut paths = Vec::new();

    while let Some(tag) = cursor.read_tag()? {
        if tag.field_number != 1 {
            cursor.skip_field(tag)?;
            continue;
        }
        expect_wire_type(tag, WireType::Len, "paths")?;
        let path = codec::decode_string("paths", cursor.read_length_delimited()?, ctx.strict_utf8)?;
        paths.push(codec::to_lower_camel_case(&path));
    }

    sink.render_field(name, ScalarValue::String(paths.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecoderConfig;
    use crate::testutil::Encoder;
    use crate::types::{FieldSchema, Kind, SchemaSet, TypeInfo, TypeSchema};
    use crate::value::Value;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn decoder() -> ProtoStreamDecoder {
        decoder_with(DecoderConfig::default())
    }

    fn decoder_with(config: DecoderConfig) -> ProtoStreamDecoder {
        let schemas = SchemaSet::new().with_type(TypeSchema::new(
            "demo.Note",
            vec![
                FieldSchema::new(1, "text", Kind::String),
                FieldSchema::message(2, "createdAt", TIMESTAMP),
            ],
        ));
        ProtoStreamDecoder::with_config(Arc::new(TypeInfo::new(schemas)), config)
    }

    fn render(type_name: &str, data: &[u8]) -> Result<Value> {
        decoder().decode_to_value(type_name, data)
    }

    fn string(value: &str) -> Value {
        Value::Scalar(ScalarValue::String(value.to_string()))
    }

    fn field(name: &str, value: Value) -> (String, Value) {
        (name.to_string(), value)
    }

    #[test]
    fn test_lookup_normalizes_urls() {
        assert!(lookup("google.protobuf.Timestamp").is_some());
        assert!(lookup("google.protobuf.Timestamp").is_some());
        assert!(lookup(".google.protobuf.Any").is_some());
        assert!(lookup("example.com/types/google.protobuf.Struct").is_some());
        assert!(!is_well_known("google.protobuf.Empty"));
        assert!(!is_well_known("demo.Note"));
    }

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(format_timestamp(0, 0).unwrap(), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(1, 500_000_000).unwrap(), "1970-01-01T00:00:01.500Z");
        assert_eq!(format_timestamp(0, 1_000).unwrap(), "1970-01-01T00:00:00.000001Z");
        assert_eq!(format_timestamp(0, 1).unwrap(), "1970-01-01T00:00:00.000000001Z");
        assert_eq!(
            format_timestamp(TIMESTAMP_MIN_SECONDS, 0).unwrap(),
            "0001-01-01T00:00:00Z"
        );
        assert_eq!(
            format_timestamp(TIMESTAMP_MAX_SECONDS, 999_999_999).unwrap(),
            "9999-12-31T23:59:59.999999999Z"
        );
    }

    #[test]
    fn test_timestamp_out_of_range() {
        assert!(matches!(
            format_timestamp(TIMESTAMP_MAX_SECONDS + 1, 0),
            Err(Error::InvalidWellKnownPayload { type_name: TIMESTAMP, .. })
        ));
        assert!(format_timestamp(TIMESTAMP_MIN_SECONDS - 1, 0).is_err());
        assert!(format_timestamp(0, -1).is_err());
        assert!(format_timestamp(0, 1_000_000_000).is_err());
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(0, 0).unwrap(), "0.000000000s");
        assert_eq!(format_duration(1, 500_000_000).unwrap(), "1.500000000s");
        assert_eq!(format_duration(-1, -500_000_000).unwrap(), "-1.500000000s");
        assert_eq!(format_duration(0, -500_000_000).unwrap(), "-0.500000000s");
        assert_eq!(format_duration(DURATION_MAX_SECONDS, 0).unwrap(), "315576000000.000000000s");

        assert!(format_duration(1, -1).is_err());
        assert!(format_duration(-1, 1).is_err());
        assert!(format_duration(0, 1_000_000_000).is_err());
        assert!(format_duration(DURATION_MAX_SECONDS + 1, 0).is_err());
    }

    #[test]
    fn test_root_timestamp() {
        let data = Encoder::new().varint(1, 1_700_000_000).varint(2, 250_000_000).finish();
        assert_eq!(render(TIMESTAMP, &data).unwrap(), string("2023-11-14T22:13:20.250Z"));

        let empty = render(TIMESTAMP, &[]).unwrap();
        assert_eq!(empty, string("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_negative_duration_from_wire() {
        let data = Encoder::new()
            .varint(1, -2i64 as u64)
            .varint(2, -250_000_000i64 as u64)
            .finish();
        assert_eq!(render(DURATION, &data).unwrap(), string("-2.250000000s"));
    }

    #[test]
    fn test_wrappers() {
        let int64 = Encoder::new().varint(1, -5i64 as u64).finish();
        assert_eq!(
            render("google.protobuf.Int64Value", &int64).unwrap(),
            Value::Scalar(ScalarValue::Int64(-5))
        );

        let text = Encoder::new().string(1, "hi").finish();
        assert_eq!(render("google.protobuf.StringValue", &text).unwrap(), string("hi"));

        let double = Encoder::new().fixed64(1, 2.5f64.to_bits()).finish();
        assert_eq!(
            render("google.protobuf.DoubleValue", &double).unwrap(),
            Value::Scalar(ScalarValue::Double(2.5))
        );

        assert_eq!(
            render("google.protobuf.BoolValue", &[]).unwrap(),
            Value::Scalar(ScalarValue::Bool(false))
        );
        assert_eq!(
            render("google.protobuf.BytesValue", &[]).unwrap(),
            Value::Scalar(ScalarValue::Bytes(Bytes::new()))
        );

        let mismatched = Encoder::new().fixed32(1, 1).finish();
        assert!(matches!(
            render("google.protobuf.UInt32Value", &mismatched),
            Err(Error::WireTypeMismatch { .. })
        ));
    }

    fn struct_entry(key: &str, value: Encoder) -> Encoder {
        Encoder::new().string(1, key).message(2, value)
    }

    #[test]
    fn test_struct_value_and_list() {
        let list = Encoder::new()
            .message(1, Encoder::new().fixed64(2, 1.0f64.to_bits()))
            .message(1, Encoder::new().string(3, "two"))
            .message(1, Encoder::new());
        let nested = Encoder::new().message(1, struct_entry("ok", Encoder::new().varint(4, 1)));
        let data = Encoder::new()
            .message(1, struct_entry("name", Encoder::new().string(3, "dune")))
            .message(1, struct_entry("items", Encoder::new().message(6, list)))
            .message(1, struct_entry("meta", Encoder::new().message(5, nested)))
            .message(1, struct_entry("gone", Encoder::new().varint(1, 0)))
            .finish();

        assert_eq!(
            render(STRUCT, &data).unwrap(),
            Value::Object(vec![
                field("name", string("dune")),
                field(
                    "items",
                    Value::List(vec![
                        Value::Scalar(ScalarValue::Double(1.0)),
                        string("two"),
                        Value::Scalar(ScalarValue::Null),
                    ])
                ),
                field(
                    "meta",
                    Value::Object(vec![field("ok", Value::Scalar(ScalarValue::Bool(true)))])
                ),
                field("gone", Value::Scalar(ScalarValue::Null)),
            ])
        );
    }

    #[test]
    fn test_struct_duplicate_keys_last_wins() {
        let data = Encoder::new()
            .message(1, struct_entry("a", Encoder::new().string(3, "first")))
            .message(1, struct_entry("b", Encoder::new().varint(4, 0)))
            .message(1, struct_entry("a", Encoder::new().string(3, "second")))
            .finish();

        assert_eq!(
            render(STRUCT, &data).unwrap(),
            Value::Object(vec![
                field("a", string("second")),
                field("b", Value::Scalar(ScalarValue::Bool(false))),
            ])
        );
    }

    #[test]
    fn test_value_last_occurrence_wins() {
        let data = Encoder::new().string(3, "text").fixed64(2, 3.0f64.to_bits()).finish();
        assert_eq!(render(VALUE, &data).unwrap(), Value::Scalar(ScalarValue::Double(3.0)));
    }

    #[test]
    fn test_nested_structs_count_towards_depth() {
        let mut value = Encoder::new().varint(4, 1);
        for _ in 0..4 {
            value = Encoder::new().message(6, Encoder::new().message(1, value));
        }
        let data = value.finish();

        let shallow = decoder_with(DecoderConfig::new().max_recursion_depth(4));
        assert!(matches!(
            shallow.decode_to_value(VALUE, &data),
            Err(Error::RecursionLimitExceeded { max_depth: 4, .. })
        ));
        assert!(decoder().decode_to_value(VALUE, &data).is_ok());
    }

    #[test]
    fn test_any_with_message_payload() {
        let note = Encoder::new()
            .string(1, "hello")
            .message(2, Encoder::new().varint(1, 60))
            .finish();
        let data = Encoder::new()
            .string(1, "type.googleapis.com/demo.Note")
            .bytes(2, &note)
            .finish();

        assert_eq!(
            render(ANY, &data).unwrap(),
            Value::Object(vec![
                field("@type", string("type.googleapis.com/demo.Note")),
                field("text", string("hello")),
                field("createdAt", string("1970-01-01T00:01:00Z")),
            ])
        );
    }

    #[test]
    fn test_any_with_well_known_payload() {
        let duration = Encoder::new().varint(1, 3).finish();
        let data = Encoder::new()
            .string(1, "type.googleapis.com/google.protobuf.Duration")
            .bytes(2, &duration)
            .finish();

        assert_eq!(
            render(ANY, &data).unwrap(),
            Value::Object(vec![
                field("@type", string("google.protobuf.Duration")),
                field("value", string("3.000000000s")),
            ])
        );
    }

    #[test]
    fn test_any_edge_cases() {
        assert_eq!(render(ANY, &[]).unwrap(), Value::Object(vec![]));

        let type_only = Encoder::new().string(1, "type.googleapis.com/demo.Note").finish();
        assert_eq!(
            render(ANY, &type_only).unwrap(),
            Value::Object(vec![field("@type", string("type.googleapis.com/demo.Note"))])
        );

        let untyped = Encoder::new().bytes(2, &[0x08, 0x01]).finish();
        assert!(matches!(
            render(ANY, &untyped),
            Err(Error::InvalidWellKnownPayload { type_name: ANY, .. })
        ));
    }

    #[test]
    fn test_field_mask() {
        let data = Encoder::new()
            .string(1, "user.display_name")
            .string(1, "photo_url")
            .finish();
        assert_eq!(render("google.protobuf.FieldMask", &data).unwrap(), string("user.displayName,photoUrl"));
        assert_eq!(render("google.protobuf.FieldMask", &[]).unwrap(), string(""));
    }
}

//! Schema-driven message walking.
//!
//! ## Architecture
//!
//! [`ProtoStreamDecoder`] reads tags from a [`Cursor`], resolves each field
//! through [`TypeInfo`] and drives an [`ObjectSink`]:
//!
//! 1. Unknown field numbers are skipped, or rendered under their number when
//!    [`DecoderConfig::render_unknown_fields`] is set
//! 2. Repeated fields are gathered per contiguous run of identical tags; a
//!    packed field is one run of its own
//! 3. Map fields are buffered so that duplicate keys resolve last-write-wins
//! 4. Nested messages go through the well-known renderers first and recurse
//!    otherwise, bounded by [`DecoderConfig::max_recursion_depth`]
//!
//! A decode is single-threaded; the decoder itself is immutable and can be
//! shared between threads.

mod context;

use crate::codec;
use crate::error::{Error, Result};
use crate::sink::ObjectSink;
use crate::types::{normalize_type_url, FieldSchema, Kind, TypeInfo, TypeSchema};
use crate::value::{ScalarValue, Value, ValueSink};
use crate::well_known;
use crate::wire::{Cursor, WireTag, WireType};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

pub use context::{DecodeContext, DecoderConfig, DEFAULT_MAX_RECURSION_DEPTH};

/// Enum rendered as an explicit null
const NULL_VALUE_ENUM: &str = "google.protobuf.NullValue";

/// Decodes protobuf wire data using runtime schemas
#[derive(Debug, Clone)]
pub struct ProtoStreamDecoder {
    type_info: Arc<TypeInfo>,
    config: DecoderConfig,
}

impl ProtoStreamDecoder {
    /// Creates a decoder with default configuration
    pub fn new(type_info: Arc<TypeInfo>) -> Self {
        Self::with_config(type_info, DecoderConfig::default())
    }

    /// Creates a decoder with custom configuration
    pub fn with_config(type_info: Arc<TypeInfo>, config: DecoderConfig) -> Self {
        Self { type_info, config }
    }

    /// The type cache used for resolution
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// The active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes one message of type `type_url` as the unnamed root object
    pub fn decode(&self, type_url: &str, data: &[u8], sink: &mut dyn ObjectSink) -> Result<()> {
        self.decode_named(type_url, "", data, sink)
    }

    /// Decodes one message of type `type_url` as an object called `name`.
    ///
    /// On error, events already delivered to `sink` describe a partial
    /// message and should be discarded by the caller.
    pub fn decode_named(
        &self,
        type_url: &str,
        name: &str,
        data: &[u8],
        sink: &mut dyn ObjectSink,
    ) -> Result<()> {
        debug!("Decoding {} bytes as {}", data.len(), type_url);
        let mut ctx = DecodeContext::new(&self.config);
        let mut cursor = Cursor::new(data);

        if let Some(renderer) = well_known::lookup(type_url) {
            trace!("Rendering root {} as a well-known type", type_url);
            return renderer(self, &mut ctx, &mut cursor, name, sink);
        }

        let schema = self.type_info.resolve_type(type_url)?;
        self.write_message(&mut ctx, &mut cursor, &schema, name, None, true, sink)
    }

    /// Decodes one message into a [`Value`] tree
    pub fn decode_to_value(&self, type_url: &str, data: &[u8]) -> Result<Value> {
        let mut sink = ValueSink::new();
        self.decode(type_url, data, &mut sink)?;
        sink.finish()
    }

    /// Walks the fields of one message until the cursor is exhausted or
    /// `end_tag` is read. Without `include_framing` the fields are emitted
    /// into the sink's current object.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn write_message(
        &self,
        ctx: &mut DecodeContext,
        cursor: &mut Cursor<'_>,
        schema: &TypeSchema,
        name: &str,
        end_tag: Option<WireTag>,
        include_framing: bool,
        sink: &mut dyn ObjectSink,
    ) -> Result<()> {
        if include_framing {
            sink.start_object(name)?;
        }

        let mut next = cursor.read_tag()?;
        loop {
            let Some(tag) = next else {
                if end_tag.is_some() {
                    return Err(Error::truncated(cursor.position(), 1));
                }
                break;
            };

            if Some(tag) == end_tag {
                break;
            }
            if tag.wire_type == WireType::EndGroup {
                return Err(Error::invalid_wire_format(
                    cursor.position(),
                    format!("unexpected end of group {} in {}", tag.field_number, schema.name()),
                ));
            }

            let Some(field) = self.type_info.find_field(schema, tag.field_number) else {
                self.render_unknown(ctx, cursor, tag, sink)?;
                next = cursor.read_tag()?;
                continue;
            };

            next = if field.is_repeated() {
                self.render_repeated(ctx, cursor, field, tag, sink)?
            } else {
                self.render_field(ctx, cursor, field, tag, &field.name, sink)?;
                cursor.read_tag()?
            };
        }

        if include_framing {
            sink.end_object()?;
        }
        Ok(())
    }

    /// Renders a run of a repeated field and returns the first tag after it
    fn render_repeated(
        &self,
        ctx: &mut DecodeContext,
        cursor: &mut Cursor<'_>,
        field: &FieldSchema,
        tag: WireTag,
        sink: &mut dyn ObjectSink,
    ) -> Result<Option<WireTag>> {
        if field.kind == Kind::Message && well_known::lookup(field.type_url()).is_none() {
            let entry = self.type_info.resolve_type(field.type_url())?;
            if entry.is_map_entry() {
                return self.render_map(ctx, cursor, field, &entry, tag, sink);
            }
        }

        sink.start_list(&field.name)?;

        if field.kind.is_packable() && tag.wire_type == WireType::Len {
            self.render_packed(ctx, cursor, field, sink)?;
            sink.end_list()?;
            return cursor.read_tag();
        }

        let mut count = 0usize;
        let next = loop {
            self.render_field(ctx, cursor, field, tag, "", sink)?;
            count += 1;
            let next = cursor.read_tag()?;
            if next != Some(tag) {
                break next;
            }
        };
        trace!("Rendered {} element(s) of {}", count, field.name);

        sink.end_list()?;
        Ok(next)
    }

    /// Renders the elements of one packed run
    fn render_packed(
        &self,
        ctx: &mut DecodeContext,
        cursor: &mut Cursor<'_>,
        field: &FieldSchema,
        sink: &mut dyn ObjectSink,
    ) -> Result<()> {
        let mut packed = cursor.read_nested()?;
        let wire_type = codec::expected_wire_type(field.kind);

        while !packed.is_at_end() {
            let raw = packed.read_raw(wire_type)?;
            let value = codec::decode_scalar(&field.name, field.kind, raw, ctx.strict_utf8)?;
            let value = match (field.kind, value) {
                (Kind::Enum, ScalarValue::Int32(number)) => self.enum_value(ctx, field, number)?,
                (_, value) => value,
            };
            sink.render_field("", value)?;
        }
        Ok(())
    }

    /// Renders a run of map entries as one object
    fn render_map(
        &self,
        ctx: &mut DecodeContext,
        cursor: &mut Cursor<'_>,
        field: &FieldSchema,
        entry: &TypeSchema,
        tag: WireTag,
        sink: &mut dyn ObjectSink,
    ) -> Result<Option<WireTag>> {
        let mut entries: Vec<(String, Value)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        let next = loop {
            check_wire_type(field, tag)?;
            let mut entry_cursor = cursor.read_nested()?;
            let (key, value) = self.read_map_entry(ctx, &mut entry_cursor, entry)?;

            match positions.get(&key) {
                Some(&index) => entries[index].1 = value,
                None => {
                    positions.insert(key.clone(), entries.len());
                    entries.push((key, value));
                }
            }

            let next = cursor.read_tag()?;
            if next != Some(tag) {
                break next;
            }
        };
        trace!("Rendered {} map entr(ies) of {}", entries.len(), field.name);

        sink.start_object(&field.name)?;
        for (key, value) in &entries {
            value.emit(key, sink)?;
        }
        sink.end_object()?;
        Ok(next)
    }

    /// Reads one map entry, buffering its value
    fn read_map_entry(
        &self,
        ctx: &mut DecodeContext,
        cursor: &mut Cursor<'_>,
        entry: &TypeSchema,
    ) -> Result<(String, Value)> {
        let mut key = None;
        let mut value = None;

        while let Some(tag) = cursor.read_tag()? {
            match self.type_info.find_field(entry, tag.field_number) {
                Some(key_field) if key_field.number == 1 => {
                    check_wire_type(key_field, tag)?;
                    let raw = cursor.read_raw(tag.wire_type)?;
                    let decoded = codec::decode_scalar(&key_field.name, key_field.kind, raw, ctx.strict_utf8)?;
                    key = Some(decoded.to_key_string());
                }
                Some(value_field) if value_field.number == 2 => {
                    let mut buffer = ValueSink::new();
                    self.render_field(ctx, cursor, value_field, tag, "", &mut buffer)?;
                    value = buffer.into_value();
                }
                _ => {
                    cursor.skip_field(tag)?;
                }
            }
        }

        let key = match key {
            Some(key) => key,
            None => match entry.field(1) {
                Some(key_field) => codec::default_scalar(key_field.kind).to_key_string(),
                None => String::new(),
            },
        };
        let value = match (value, entry.field(2)) {
            (Some(value), _) => value,
            (None, Some(value_field)) => self.default_value(ctx, value_field)?,
            (None, None) => Value::Scalar(ScalarValue::Null),
        };
        Ok((key, value))
    }

    /// Value rendered for a map value missing from its entry
    fn default_value(&self, ctx: &mut DecodeContext, field: &FieldSchema) -> Result<Value> {
        let value = match field.kind {
            kind if kind.is_message() => Value::Object(Vec::new()),
            Kind::Enum => Value::Scalar(self.enum_value(ctx, field, 0)?),
            kind => Value::Scalar(codec::default_scalar(kind)),
        };
        Ok(value)
    }

    /// Renders one occurrence of a field under `name`
    pub(crate) fn render_field(
        &self,
        ctx: &mut DecodeContext,
        cursor: &mut Cursor<'_>,
        field: &FieldSchema,
        tag: WireTag,
        name: &str,
        sink: &mut dyn ObjectSink,
    ) -> Result<()> {
        check_wire_type(field, tag)?;

        match field.kind {
            kind if kind.is_message() => self.render_message_field(ctx, cursor, field, tag, name, sink),
            Kind::Enum => {
                let number = cursor.read_varint()? as i32;
                let value = self.enum_value(ctx, field, number)?;
                sink.render_field(name, value)
            }
            kind => {
                let raw = cursor.read_raw(tag.wire_type)?;
                let value = codec::decode_scalar(&field.name, kind, raw, ctx.strict_utf8)?;
                sink.render_field(name, value)
            }
        }
    }

    fn render_message_field(
        &self,
        ctx: &mut DecodeContext,
        cursor: &mut Cursor<'_>,
        field: &FieldSchema,
        tag: WireTag,
        name: &str,
        sink: &mut dyn ObjectSink,
    ) -> Result<()> {
        let type_url = field.type_url();

        ctx.within(normalize_type_url(type_url), &field.name, |ctx| {
            if tag.wire_type == WireType::StartGroup {
                let schema = self.type_info.resolve_type(type_url)?;
                let end_tag = WireTag::end_group(tag.field_number);
                return self.write_message(ctx, cursor, &schema, name, Some(end_tag), true, sink);
            }

            let mut nested = cursor.read_nested()?;
            if let Some(renderer) = well_known::lookup(type_url) {
                trace!("Rendering {} as a well-known type", type_url);
                return renderer(self, ctx, &mut nested, name, sink);
            }

            let schema = self.type_info.resolve_type(type_url)?;
            self.write_message(ctx, &mut nested, &schema, name, None, true, sink)
        })
    }

    /// Resolves an enum number to its rendered form
    fn enum_value(&self, ctx: &DecodeContext, field: &FieldSchema, number: i32) -> Result<ScalarValue> {
        if normalize_type_url(field.type_url()) == NULL_VALUE_ENUM {
            return Ok(ScalarValue::Null);
        }
        let schema = self.type_info.resolve_enum(field.type_url())?;
        Ok(codec::decode_enum(number, &schema, ctx.lower_camel_enum_names))
    }

    /// Skips a field missing from the schema, or renders it under its number
    fn render_unknown(
        &self,
        ctx: &mut DecodeContext,
        cursor: &mut Cursor<'_>,
        tag: WireTag,
        sink: &mut dyn ObjectSink,
    ) -> Result<()> {
        if !ctx.emit_unknown_fields {
            trace!("Skipping unknown field {}", tag);
            cursor.skip_field(tag)?;
            return Ok(());
        }

        let value = match tag.wire_type {
            WireType::Varint => ScalarValue::UInt64(cursor.read_varint()?),
            WireType::I64 => ScalarValue::UInt64(cursor.read_fixed64()?),
            WireType::I32 => ScalarValue::UInt32(cursor.read_fixed32()?),
            WireType::Len | WireType::StartGroup | WireType::EndGroup => {
                ScalarValue::Bytes(Bytes::copy_from_slice(cursor.skip_field(tag)?))
            }
        };
        sink.render_field(&tag.field_number.to_string(), value)
    }
}

/// Verifies that `tag` can carry a value of `field`'s kind
fn check_wire_type(field: &FieldSchema, tag: WireTag) -> Result<()> {
    let expected = codec::expected_wire_type(field.kind);
    if tag.wire_type == expected {
        return Ok(());
    }
    Err(Error::wire_type_mismatch(&field.name, expected, tag.wire_type))
}

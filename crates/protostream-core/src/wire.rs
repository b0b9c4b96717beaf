//! Low-level protobuf wire format reading.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 3/4: SGROUP/EGROUP (proto2 groups)
//! - 5: I32 (fixed32, sfixed32, float)
//!
//! [`Cursor`] is a forward-only reader over an in-memory buffer. Nested
//! length-delimited messages are read through a sub-cursor that covers exactly
//! the payload, so the end of a nested message is simply the end of its cursor.

use crate::error::{Error, Result};
use std::fmt;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    I32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::I32),
            _ => Err(Error::invalid_wire_format(
                0,
                format!("unknown wire type: {}", value),
            )),
        }
    }
}

/// A decoded field tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireTag {
    /// Field number, never 0
    pub field_number: u32,
    /// Wire type of the value that follows
    pub wire_type: WireType,
}

impl WireTag {
    /// Creates a new tag
    pub fn new(field_number: u32, wire_type: WireType) -> Self {
        Self {
            field_number,
            wire_type,
        }
    }

    /// The END_GROUP tag closing a group opened with `field_number`
    pub fn end_group(field_number: u32) -> Self {
        Self::new(field_number, WireType::EndGroup)
    }

    /// The raw tag value as it appears on the wire
    pub fn raw(&self) -> u32 {
        (self.field_number << 3) | self.wire_type as u32
    }
}

impl fmt::Display for WireTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.field_number, self.wire_type)
    }
}

/// An undecoded field value, shaped only by its wire type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    /// Varint payload
    Varint(u64),
    /// Little-endian 32-bit payload
    Fixed32(u32),
    /// Little-endian 64-bit payload
    Fixed64(u64),
    /// Length-delimited payload
    LengthDelimited(&'a [u8]),
}

impl RawValue<'_> {
    /// The wire type this value was read with
    pub fn wire_type(&self) -> WireType {
        match self {
            RawValue::Varint(_) => WireType::Varint,
            RawValue::Fixed32(_) => WireType::I32,
            RawValue::Fixed64(_) => WireType::I64,
            RawValue::LengthDelimited(_) => WireType::Len,
        }
    }
}

/// Decode a varint from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed. `offset` is
/// only used for error reporting.
pub fn decode_varint(data: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= 10 {
            // Varints are at most 10 bytes for a 64-bit value
            return Err(Error::malformed_varint(offset));
        }

        // The tenth byte may only carry bit 63
        if i == 9 && byte > 1 {
            return Err(Error::malformed_varint(offset));
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    if data.len() >= 10 {
        Err(Error::malformed_varint(offset))
    } else {
        Err(Error::truncated(offset + data.len(), 1))
    }
}

/// Forward-only reader over an encoded message
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` in the top-level buffer
    base: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor over a complete buffer
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    fn nested(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute offset of the next byte to be read
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    /// Returns true once every byte has been consumed
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.data.len() - self.pos;
        if available < len {
            return Err(Error::truncated(self.position(), len - available));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads a varint
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, len) = decode_varint(self.remaining(), self.position())?;
        self.pos += len;
        Ok(value)
    }

    /// Reads a little-endian 32-bit value
    pub fn read_fixed32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a little-endian 64-bit value
    pub fn read_fixed64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a length prefix and returns the payload it covers
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8]> {
        let offset = self.position();
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| {
            Error::invalid_wire_format(offset, format!("length prefix {} too large", len))
        })?;
        self.take(len)
    }

    /// Reads a length-delimited payload and returns a cursor over it
    pub fn read_nested(&mut self) -> Result<Cursor<'a>> {
        let payload = self.read_length_delimited()?;
        let base = self.position() - payload.len();
        Ok(Cursor::nested(payload, base))
    }

    /// Reads the next tag, or `None` at the end of the buffer
    pub fn read_tag(&mut self) -> Result<Option<WireTag>> {
        if self.is_at_end() {
            return Ok(None);
        }

        let offset = self.position();
        let raw = self.read_varint()?;
        let raw = u32::try_from(raw).map_err(|_| Error::malformed_varint(offset))?;

        let wire_type = WireType::try_from((raw & 0x07) as u8)
            .map_err(|_| Error::invalid_wire_format(offset, format!("unknown wire type: {}", raw & 0x07)))?;
        let field_number = raw >> 3;

        if field_number == 0 {
            return Err(Error::invalid_wire_format(offset, "field number 0 is reserved"));
        }

        Ok(Some(WireTag::new(field_number, wire_type)))
    }

    /// Reads a scalar value shaped by `wire_type`
    pub fn read_raw(&mut self, wire_type: WireType) -> Result<RawValue<'a>> {
        match wire_type {
            WireType::Varint => self.read_varint().map(RawValue::Varint),
            WireType::I64 => self.read_fixed64().map(RawValue::Fixed64),
            WireType::Len => self.read_length_delimited().map(RawValue::LengthDelimited),
            WireType::I32 => self.read_fixed32().map(RawValue::Fixed32),
            WireType::StartGroup | WireType::EndGroup => Err(Error::invalid_wire_format(
                self.position(),
                format!("{:?} does not carry a scalar value", wire_type),
            )),
        }
    }

    /// Skips the value following `tag` and returns the bytes it occupied.
    ///
    /// For length-delimited values this is the payload without its prefix;
    /// for groups it is everything between the start and end tags.
    pub fn skip_field(&mut self, tag: WireTag) -> Result<&'a [u8]> {
        let start = self.pos;
        match tag.wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::I64 => {
                self.take(8)?;
            }
            WireType::I32 => {
                self.take(4)?;
            }
            WireType::Len => return self.read_length_delimited(),
            WireType::StartGroup => return self.skip_group(tag.field_number),
            WireType::EndGroup => {
                return Err(Error::invalid_wire_format(
                    self.position(),
                    format!("unexpected end of group {}", tag.field_number),
                ))
            }
        }
        Ok(&self.data[start..self.pos])
    }

    /// Skips a group body, including nested groups, without recursion
    fn skip_group(&mut self, field_number: u32) -> Result<&'a [u8]> {
        let start = self.pos;
        let mut open = vec![field_number];

        while let Some(&expected) = open.last() {
            let tag_start = self.pos;
            let Some(tag) = self.read_tag()? else {
                return Err(Error::truncated(self.position(), 1));
            };
            match tag.wire_type {
                WireType::StartGroup => open.push(tag.field_number),
                WireType::EndGroup if tag.field_number == expected => {
                    open.pop();
                    if open.is_empty() {
                        return Ok(&self.data[start..tag_start]);
                    }
                }
                WireType::EndGroup => {
                    return Err(Error::invalid_wire_format(
                        self.base + tag_start,
                        format!("end of group {} while group {} is open", tag.field_number, expected),
                    ))
                }
                _ => {
                    self.skip_field(tag)?;
                }
            }
        }

        Ok(&self.data[start..self.pos])
    }
}

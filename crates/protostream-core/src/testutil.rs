//! Minimal wire encoder for building test inputs.

use crate::wire::{WireTag, WireType};
use prost::encoding::encode_varint;

#[derive(Debug, Default, Clone)]
pub(crate) struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn tag(mut self, field_number: u32, wire_type: WireType) -> Self {
        encode_varint(u64::from(WireTag::new(field_number, wire_type).raw()), &mut self.buf);
        self
    }

    pub(crate) fn varint(self, field_number: u32, value: u64) -> Self {
        let mut this = self.tag(field_number, WireType::Varint);
        encode_varint(value, &mut this.buf);
        this
    }

    pub(crate) fn sint64(self, field_number: u32, value: i64) -> Self {
        self.varint(field_number, ((value << 1) ^ (value >> 63)) as u64)
    }

    pub(crate) fn fixed32(self, field_number: u32, value: u32) -> Self {
        let mut this = self.tag(field_number, WireType::I32);
        this.buf.extend_from_slice(&value.to_le_bytes());
        this
    }

    pub(crate) fn fixed64(self, field_number: u32, value: u64) -> Self {
        let mut this = self.tag(field_number, WireType::I64);
        this.buf.extend_from_slice(&value.to_le_bytes());
        this
    }

    pub(crate) fn bytes(self, field_number: u32, value: &[u8]) -> Self {
        let mut this = self.tag(field_number, WireType::Len);
        encode_varint(value.len() as u64, &mut this.buf);
        this.buf.extend_from_slice(value);
        this
    }

    pub(crate) fn string(self, field_number: u32, value: &str) -> Self {
        self.bytes(field_number, value.as_bytes())
    }

    pub(crate) fn message(self, field_number: u32, inner: Encoder) -> Self {
        self.bytes(field_number, &inner.finish())
    }

    pub(crate) fn group(self, field_number: u32, inner: Encoder) -> Self {
        let mut this = self.tag(field_number, WireType::StartGroup);
        this.buf.extend_from_slice(&inner.finish());
        this.tag(field_number, WireType::EndGroup)
    }

    pub(crate) fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }
}

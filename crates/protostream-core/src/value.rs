//! Decoded values.
//!
//! [`ScalarValue`] is what the decoder hands to a sink for every leaf. A
//! [`Value`] tree is the in-memory form of a whole decoded message, built by
//! [`ValueSink`] and replayable into any other sink with [`Value::emit`].

use crate::error::{Error, Result};
use crate::sink::ObjectSink;
use bytes::Bytes;

/// A decoded leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// Explicit null (`google.protobuf.NullValue`, empty `Value`)
    Null,
    /// `bool`
    Bool(bool),
    /// `int32`, `sint32`, `sfixed32` and unmatched enum numbers
    Int32(i32),
    /// `int64`, `sint64`, `sfixed64`
    Int64(i64),
    /// `uint32`, `fixed32`
    UInt32(u32),
    /// `uint64`, `fixed64`
    UInt64(u64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `string` and string renderings of well-known types
    String(String),
    /// `bytes`
    Bytes(Bytes),
    /// Name of a known enum value
    Enum(String),
}

impl ScalarValue {
    /// String form used when the value is a map key
    pub fn to_key_string(&self) -> String {
        match self {
            ScalarValue::Null => "null".to_string(),
            ScalarValue::Bool(v) => v.to_string(),
            ScalarValue::Int32(v) => v.to_string(),
            ScalarValue::Int64(v) => v.to_string(),
            ScalarValue::UInt32(v) => v.to_string(),
            ScalarValue::UInt64(v) => v.to_string(),
            ScalarValue::Float(v) => v.to_string(),
            ScalarValue::Double(v) => v.to_string(),
            ScalarValue::String(v) | ScalarValue::Enum(v) => v.clone(),
            ScalarValue::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
        }
    }

    /// Returns the string payload of `String` and `Enum` values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(v) | ScalarValue::Enum(v) => Some(v),
            _ => None,
        }
    }
}

/// A decoded message tree
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A leaf
    Scalar(ScalarValue),
    /// A list of values
    List(Vec<Value>),
    /// Named fields in emission order. Names can repeat when a repeated
    /// field arrived in several non-contiguous runs.
    Object(Vec<(String, Value)>),
}

impl Value {
    /// First field called `name` when this is an object
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The leaf, if this is a scalar
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Value::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// The elements, if this is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The fields, if this is an object
    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Replays this tree into `sink` under `name`
    pub fn emit(&self, name: &str, sink: &mut dyn ObjectSink) -> Result<()> {
        match self {
            Value::Scalar(v) => sink.render_field(name, v.clone()),
            Value::List(items) => {
                sink.start_list(name)?;
                for item in items {
                    item.emit("", sink)?;
                }
                sink.end_list()
            }
            Value::Object(fields) => {
                sink.start_object(name)?;
                for (key, value) in fields {
                    value.emit(key, sink)?;
                }
                sink.end_object()
            }
        }
    }
}

impl From<ScalarValue> for Value {
    fn from(value: ScalarValue) -> Self {
        Value::Scalar(value)
    }
}

#[derive(Debug)]
enum Frame {
    Object(Vec<(String, Value)>),
    List(Vec<Value>),
}

/// Sink that assembles events into a [`Value`] tree
#[derive(Debug, Default)]
pub struct ValueSink {
    stack: Vec<(String, Frame)>,
    root: Option<Value>,
}

impl ValueSink {
    /// Creates an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the completed root, failing if nothing was emitted or a frame
    /// is still open
    pub fn finish(self) -> Result<Value> {
        if !self.stack.is_empty() {
            return Err(Error::sink_rejected(format!(
                "{} unclosed object/list frame(s)",
                self.stack.len()
            )));
        }
        self.root
            .ok_or_else(|| Error::sink_rejected("no value was emitted"))
    }

    /// Returns the completed root, if any
    pub fn into_value(self) -> Option<Value> {
        if self.stack.is_empty() {
            self.root
        } else {
            None
        }
    }

    fn attach(&mut self, name: &str, value: Value) {
        match self.stack.last_mut() {
            Some((_, Frame::Object(fields))) => fields.push((name.to_string(), value)),
            Some((_, Frame::List(items))) => items.push(value),
            None => self.root = Some(value),
        }
    }
}

impl ObjectSink for ValueSink {
    fn start_object(&mut self, name: &str) -> Result<()> {
        self.stack.push((name.to_string(), Frame::Object(Vec::new())));
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some((name, Frame::Object(fields))) => {
                self.attach(&name, Value::Object(fields));
                Ok(())
            }
            _ => Err(Error::sink_rejected("end_object without matching start_object")),
        }
    }

    fn start_list(&mut self, name: &str) -> Result<()> {
        self.stack.push((name.to_string(), Frame::List(Vec::new())));
        Ok(())
    }

    fn end_list(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some((name, Frame::List(items))) => {
                self.attach(&name, Value::List(items));
                Ok(())
            }
            _ => Err(Error::sink_rejected("end_list without matching start_list")),
        }
    }

    fn render_field(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        self.attach(name, Value::Scalar(value));
        Ok(())
    }
}

#[cfg(feature = "extended-formats")]
mod json {
    use super::{ScalarValue, Value};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde_json::{Map, Number, Value as Json};

    impl Value {
        /// Converts the tree to JSON following the proto3 JSON mapping:
        /// 64-bit integers become strings, bytes become base64 and
        /// non-finite floats become `"NaN"`, `"Infinity"` or `"-Infinity"`.
        /// Later duplicates of a field name replace earlier ones.
        pub fn to_json(&self) -> Json {
            match self {
                Value::Scalar(v) => scalar_to_json(v),
                Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
                Value::Object(fields) => {
                    let mut map = Map::new();
                    for (key, value) in fields {
                        map.insert(key.clone(), value.to_json());
                    }
                    Json::Object(map)
                }
            }
        }
    }

    fn scalar_to_json(value: &ScalarValue) -> Json {
        match value {
            ScalarValue::Null => Json::Null,
            ScalarValue::Bool(v) => Json::Bool(*v),
            ScalarValue::Int32(v) => Json::from(*v),
            ScalarValue::UInt32(v) => Json::from(*v),
            ScalarValue::Int64(v) => Json::String(v.to_string()),
            ScalarValue::UInt64(v) => Json::String(v.to_string()),
            ScalarValue::Float(v) => float_to_json(widen_shortest(*v)),
            ScalarValue::Double(v) => float_to_json(*v),
            ScalarValue::String(v) | ScalarValue::Enum(v) => Json::String(v.clone()),
            ScalarValue::Bytes(v) => Json::String(STANDARD.encode(v)),
        }
    }

    /// Widens through the shortest decimal form so `0.1f32` stays `0.1`
    fn widen_shortest(value: f32) -> f64 {
        if !value.is_finite() {
            return f64::from(value);
        }
        value.to_string().parse().unwrap_or(f64::from(value))
    }

    fn float_to_json(value: f64) -> Json {
        match Number::from_f64(value) {
            Some(number) => Json::Number(number),
            None if value.is_nan() => Json::String("NaN".to_string()),
            None if value > 0.0 => Json::String("Infinity".to_string()),
            None => Json::String("-Infinity".to_string()),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use bytes::Bytes;
        use pretty_assertions::assert_eq;
        use serde_json::json;

        #[test]
        fn test_to_json_mapping() {
            let value = Value::Object(vec![
                ("id".to_string(), ScalarValue::Int64(-7).into()),
                ("small".to_string(), ScalarValue::UInt32(3).into()),
                ("ratio".to_string(), ScalarValue::Double(f64::NEG_INFINITY).into()),
                ("weight".to_string(), ScalarValue::Float(f32::NAN).into()),
                ("scale".to_string(), ScalarValue::Float(0.1).into()),
                ("limit".to_string(), ScalarValue::Float(f32::MAX).into()),
                ("blob".to_string(), ScalarValue::Bytes(Bytes::from_static(b"hi")).into()),
                (
                    "tags".to_string(),
                    Value::List(vec![ScalarValue::Enum("DRAMA".to_string()).into()]),
                ),
                ("none".to_string(), ScalarValue::Null.into()),
            ]);

            assert_eq!(
                value.to_json(),
                json!({
                    "id": "-7",
                    "small": 3,
                    "ratio": "-Infinity",
                    "weight": "NaN",
                    "scale": 0.1,
                    "limit": 3.4028235e38,
                    "blob": "aGk=",
                    "tags": ["DRAMA"],
                    "none": null,
                })
            );
        }
    }
}

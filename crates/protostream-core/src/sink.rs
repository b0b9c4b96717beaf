//! Destination for decoded structure.
//!
//! The decoder is the sole producer of events; a sink decides what to do with
//! them. Returning an error from any method stops the decode immediately and
//! the error becomes the result of the decode call.

use crate::error::Result;
use crate::value::ScalarValue;

/// Receiver of structural decode events.
///
/// Every method has a no-op default so sinks only implement what they need.
/// List elements and the root object are emitted with an empty name; map
/// entries are emitted as object fields named by the map key.
///
/// # Example
///
/// ```
/// use protostream_core::{ObjectSink, Result, ScalarValue};
///
/// #[derive(Default)]
/// struct FieldNames(Vec<String>);
///
/// impl ObjectSink for FieldNames {
///     fn render_field(&mut self, name: &str, _value: ScalarValue) -> Result<()> {
///         self.0.push(name.to_string());
///         Ok(())
///     }
/// }
/// ```
pub trait ObjectSink {
    /// Opens an object
    fn start_object(&mut self, name: &str) -> Result<()> {
        let _ = name;
        Ok(())
    }

    /// Closes the innermost object
    fn end_object(&mut self) -> Result<()> {
        Ok(())
    }

    /// Opens a list
    fn start_list(&mut self, name: &str) -> Result<()> {
        let _ = name;
        Ok(())
    }

    /// Closes the innermost list
    fn end_list(&mut self) -> Result<()> {
        Ok(())
    }

    /// Emits a scalar
    fn render_field(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let _ = (name, value);
        Ok(())
    }

    /// Emits a null
    fn render_null(&mut self, name: &str) -> Result<()> {
        self.render_field(name, ScalarValue::Null)
    }
}

/// A no-op sink that discards all events
pub struct NullSink;

impl ObjectSink for NullSink {}

/// A sink that counts events, useful for validating input without keeping it
#[derive(Debug, Default)]
pub struct StatsSink {
    /// Number of objects opened
    pub object_count: usize,
    /// Number of lists opened
    pub list_count: usize,
    /// Number of scalars emitted
    pub field_count: usize,
    /// Deepest object/list nesting seen
    pub max_nesting: usize,
    nesting: usize,
}

impl StatsSink {
    fn open(&mut self) {
        self.nesting += 1;
        self.max_nesting = self.max_nesting.max(self.nesting);
    }
}

impl ObjectSink for StatsSink {
    fn start_object(&mut self, _name: &str) -> Result<()> {
        self.object_count += 1;
        self.open();
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        self.nesting = self.nesting.saturating_sub(1);
        Ok(())
    }

    fn start_list(&mut self, _name: &str) -> Result<()> {
        self.list_count += 1;
        self.open();
        Ok(())
    }

    fn end_list(&mut self) -> Result<()> {
        self.nesting = self.nesting.saturating_sub(1);
        Ok(())
    }

    fn render_field(&mut self, _name: &str, _value: ScalarValue) -> Result<()> {
        self.field_count += 1;
        Ok(())
    }
}

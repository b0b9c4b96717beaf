//! Decoder configuration and per-call state.

use crate::error::{Error, Result};

/// Default ceiling for nested message depth
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 64;

/// Configuration for [`ProtoStreamDecoder`](super::ProtoStreamDecoder)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum nesting of messages below the root (default: 64)
    pub max_recursion_depth: usize,
    /// Render enum names as lowerCamelCase instead of their declared form
    pub use_lower_camel_for_enums: bool,
    /// Surface fields missing from the schema under their field number
    pub render_unknown_fields: bool,
    /// Reject invalid UTF-8 in string fields (default: true)
    pub strict_utf8: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            use_lower_camel_for_enums: false,
            render_unknown_fields: false,
            strict_utf8: true,
        }
    }
}

impl DecoderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum recursion depth
    pub fn max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Sets whether enum names are rendered in lowerCamelCase
    pub fn use_lower_camel_for_enums(mut self, enabled: bool) -> Self {
        self.use_lower_camel_for_enums = enabled;
        self
    }

    /// Sets whether unknown fields are rendered
    pub fn render_unknown_fields(mut self, enabled: bool) -> Self {
        self.render_unknown_fields = enabled;
        self
    }

    /// Sets whether invalid UTF-8 is an error
    pub fn strict_utf8(mut self, strict: bool) -> Self {
        self.strict_utf8 = strict;
        self
    }
}

/// State threaded through one top-level decode
#[derive(Debug, Clone)]
pub struct DecodeContext {
    depth: usize,
    max_depth: usize,
    pub(crate) emit_unknown_fields: bool,
    pub(crate) lower_camel_enum_names: bool,
    pub(crate) strict_utf8: bool,
}

impl DecodeContext {
    /// Creates the context for a new decode at depth 0
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            depth: 0,
            max_depth: config.max_recursion_depth,
            emit_unknown_fields: config.render_unknown_fields,
            lower_camel_enum_names: config.use_lower_camel_for_enums,
            strict_utf8: config.strict_utf8,
        }
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Runs `f` one level deeper. The depth is restored on every return path.
    pub(crate) fn within<T>(
        &mut self,
        type_name: &str,
        field_name: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(Error::recursion_limit(type_name, field_name, self.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DecoderConfig::new()
            .max_recursion_depth(8)
            .use_lower_camel_for_enums(true)
            .render_unknown_fields(true)
            .strict_utf8(false);

        assert_eq!(config.max_recursion_depth, 8);
        assert!(config.use_lower_camel_for_enums);
        assert!(config.render_unknown_fields);
        assert!(!config.strict_utf8);
        assert_eq!(DecoderConfig::default().max_recursion_depth, 64);
    }

    #[test]
    fn test_within_restores_depth() {
        let mut ctx = DecodeContext::new(&DecoderConfig::new().max_recursion_depth(2));
        let seen = ctx
            .within("a.A", "one", |ctx| ctx.within("a.A", "two", |ctx| Ok(ctx.depth())))
            .unwrap();
        assert_eq!(seen, 2);
        assert_eq!(ctx.depth(), 0);

        let err = ctx
            .within("a.A", "one", |ctx| {
                ctx.within("a.A", "two", |ctx| ctx.within("a.A", "three", |_| Ok(())))
            })
            .unwrap_err();
        assert!(matches!(err, Error::RecursionLimitExceeded { ref field_name, .. } if field_name == "three"));
        assert_eq!(ctx.depth(), 0);
    }
}

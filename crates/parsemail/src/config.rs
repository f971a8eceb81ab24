//! Parser configuration types.

/// Default limit on multipart nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum multipart nesting depth. The top-level container is depth 1.
    pub max_depth: usize,
    /// Whether to build the encoded-word decoded copy of the header.
    pub decode_headers: bool,
}

impl Config {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            decode_headers: true,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for parser configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    max_depth: usize,
    decode_headers: bool,
}

impl ConfigBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            decode_headers: true,
        }
    }

    /// Sets the maximum multipart nesting depth.
    #[must_use]
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets whether the decoded header copy is built.
    #[must_use]
    pub const fn decode_headers(mut self, decode_headers: bool) -> Self {
        self.decode_headers = decode_headers;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub const fn build(self) -> Config {
        Config {
            max_depth: self.max_depth,
            decode_headers: self.decode_headers,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_depth, 32);
        assert!(config.decode_headers);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder().max_depth(4).decode_headers(false).build();
        assert_eq!(config.max_depth, 4);
        assert!(!config.decode_headers);
    }
}

//! Store configuration.

use recordfs_codec::Format;
use std::time::Duration;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the root directory if it doesn't exist.
    pub create_if_missing: bool,

    /// How often file-backed watches poll for changes.
    pub poll_interval: Duration,

    /// How many times a versioned `put` retries after losing a race for a
    /// version number.
    pub put_retries: u32,

    /// Format for schema-file kinds that do not name one. Kinds built in
    /// code pick theirs with [`EntityKindBuilder::format`](crate::EntityKindBuilder::format).
    pub default_format: Format,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            poll_interval: Duration::from_millis(50),
            put_retries: 8,
            default_format: Format::Json,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the root directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the watch poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the number of versioned `put` retries.
    #[must_use]
    pub const fn put_retries(mut self, retries: u32) -> Self {
        self.put_retries = retries;
        self
    }

    /// Sets the default record format.
    #[must_use]
    pub const fn default_format(mut self, format: Format) -> Self {
        self.default_format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert_eq!(config.put_retries, 8);
        assert_eq!(config.default_format, Format::Json);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .put_retries(2)
            .poll_interval(Duration::from_millis(10))
            .default_format(Format::Cbor);

        assert!(!config.create_if_missing);
        assert_eq!(config.put_retries, 2);
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.default_format, Format::Cbor);
    }
}

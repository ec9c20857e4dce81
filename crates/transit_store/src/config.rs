//! Durable job store configuration.

/// Configuration for a [`DurableJobStore`](crate::DurableJobStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to sync the log after every write (safer but slower).
    pub sync_on_write: bool,

    /// Compact the log after this many frames have been appended since the
    /// last compaction (`None` = only on request).
    pub compact_after: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            compact_after: None,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to sync the log on every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the automatic compaction threshold.
    #[must_use]
    pub const fn compact_after(mut self, frames: u64) -> Self {
        self.compact_after = Some(frames);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert!(config.sync_on_write);
        assert!(config.compact_after.is_none());
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new().sync_on_write(false).compact_after(64);
        assert!(!config.sync_on_write);
        assert_eq!(config.compact_after, Some(64));
    }
}

//! Entity layer configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration shared by every entity type built on one context.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a statistics snapshot stays cached (zero = until invalidated).
    pub stats_ttl: Duration,

    /// Directory receiving export artifacts.
    pub export_dir: PathBuf,

    /// File name prefix for export artifacts.
    pub export_prefix: String,

    /// Field delimiter for CSV exports.
    pub csv_delimiter: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stats_ttl: Duration::from_secs(300),
            export_dir: std::env::temp_dir(),
            export_prefix: "entikit-export".to_string(),
            csv_delimiter: b',',
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the statistics cache TTL.
    #[must_use]
    pub fn stats_ttl(mut self, ttl: Duration) -> Self {
        self.stats_ttl = ttl;
        self
    }

    /// Sets the export directory.
    #[must_use]
    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Sets the export file name prefix.
    #[must_use]
    pub fn export_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.export_prefix = prefix.into();
        self
    }

    /// Sets the CSV field delimiter.
    #[must_use]
    pub fn csv_delimiter(mut self, delimiter: u8) -> Self {
        self.csv_delimiter = delimiter;
        self
    }
}

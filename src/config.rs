//! Configuration options for opening a ring.
//!
//! A [`RingConfig`] carries everything a ring needs at open time: the
//! submission queue depth, an optional completion queue size, and the
//! [`DescriptorPolicy`] that decides whether closing the ring also closes
//! the bound file. Logging has its own [`LoggingConfig`].

use std::path::PathBuf;

use crate::error::{Result, RingError};
use crate::logging::LogLevel;

/// Largest submission queue the kernel accepts (`IORING_MAX_ENTRIES`).
pub const MAX_ENTRIES: u32 = 32768;

/// Default submission queue depth, matching the depth the demo client uses.
pub const DEFAULT_ENTRIES: u32 = 8;

/// What happens to the bound descriptor when the ring is closed or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorPolicy {
    /// The ring owns the descriptor and closes it on teardown.
    #[default]
    Close,
    /// The ring hands the descriptor back from [`Ring::close`] and never
    /// closes it itself.
    ///
    /// [`Ring::close`]: crate::Ring::close
    Keep,
}

/// Ring-specific configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Number of submission queue entries (rounded up to a power of two)
    pub entries: u32,
    /// Number of completion queue entries (None = kernel default, twice `entries`)
    pub cq_entries: Option<u32>,
    /// Descriptor ownership on close
    pub descriptor: DescriptorPolicy,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES,
            cq_entries: None,
            descriptor: DescriptorPolicy::Close,
        }
    }
}

impl RingConfig {
    /// Default configuration with the given submission queue depth.
    pub fn with_entries(entries: u32) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    /// Validate the configuration before any resource is acquired.
    pub fn validate(&self) -> Result<()> {
        if self.entries == 0 || self.entries > MAX_ENTRIES {
            return Err(RingError::InvalidCapacity {
                entries: self.entries,
            });
        }

        if let Some(cq_entries) = self.cq_entries {
            if cq_entries < self.entries || cq_entries > 2 * MAX_ENTRIES {
                return Err(RingError::InvalidCqEntries {
                    cq_entries,
                    entries: self.entries,
                });
            }
        }

        Ok(())
    }
}

/// Logging and debugging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Minimum log level (overridden by `RUST_LOG` when set)
    pub level: LogLevel,
    /// Use JSON format for logs
    pub json_format: bool,
    /// Log file path (None = stderr)
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Warn,
            json_format: false,
            log_file: None,
        }
    }
}

impl LoggingConfig {
    /// Configuration for development: debug level, human-readable output.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            ..Default::default()
        }
    }

    /// Logging switched off entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Configuration builder for fluent configuration creation.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: RingConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the submission queue depth.
    pub fn entries(mut self, entries: u32) -> Self {
        self.config.entries = entries;
        self
    }

    /// Set an explicit completion queue size.
    pub fn cq_entries(mut self, cq_entries: u32) -> Self {
        self.config.cq_entries = Some(cq_entries);
        self
    }

    /// Choose whether closing the ring closes the bound descriptor.
    pub fn descriptor(mut self, policy: DescriptorPolicy) -> Self {
        self.config.descriptor = policy;
        self
    }

    /// Shorthand for `descriptor(DescriptorPolicy::Close)` / `Keep`.
    pub fn close_descriptor(self, close: bool) -> Self {
        self.descriptor(if close {
            DescriptorPolicy::Close
        } else {
            DescriptorPolicy::Keep
        })
    }

    /// Build the final configuration.
    pub fn build(self) -> Result<RingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

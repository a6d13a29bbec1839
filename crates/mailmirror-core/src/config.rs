//! Sync configuration.
//!
//! The engine reads three tunables from its environment: the default page
//! size, how many days back a canonical view searches, and how many times
//! a part fetch is retried when the server omits data.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default number of headers handed out per page.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default number of part-fetch retries after the first attempt.
pub const DEFAULT_MAX_FETCH_ATTEMPTS: u32 = 3;

/// Configuration for folder sync and pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Page size used when the caller does not pass one.
    pub batch_size: usize,
    /// How many days back canonical views search; 0 means no limit.
    pub sync_days: u32,
    /// Retries for a part fetch, on top of the initial attempt.
    pub max_fetch_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            sync_days: 0,
            max_fetch_attempts: DEFAULT_MAX_FETCH_ATTEMPTS,
        }
    }
}

impl SyncConfig {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::new()
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Checks that the values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `batch_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default page size.
    #[must_use]
    pub const fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Sets the search window in days.
    #[must_use]
    pub const fn sync_days(mut self, days: u32) -> Self {
        self.config.sync_days = days;
        self
    }

    /// Sets the number of part-fetch retries.
    #[must_use]
    pub const fn max_fetch_attempts(mut self, attempts: u32) -> Self {
        self.config.max_fetch_attempts = attempts;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a value is invalid.
    pub fn build(self) -> Result<SyncConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

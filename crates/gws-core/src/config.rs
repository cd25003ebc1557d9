//! Workspace configuration

use crate::error::SystemError;
use gws_store::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Facade configuration
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Storage key the persisted document lives under
    pub storage_key: String,
    /// Longest wait for the persisted document on startup
    pub hydration_timeout_ms: u64,
    /// How many recently referenced artifacts the pronoun strategy remembers
    pub recent_reference_limit: usize,
    /// Link new artifacts to existing ones by kind affinity
    pub auto_link_on_create: bool,
    /// Record relationships stated in chat messages
    pub detect_relationships_in_messages: bool,
}

impl SystemConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML or has mistyped keys
    pub fn from_toml_str(text: &str) -> Result<Self, SystemError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SystemError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SystemError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// With storage key
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// With hydration timeout
    #[inline]
    #[must_use]
    pub fn with_hydration_timeout(mut self, timeout: Duration) -> Self {
        self.hydration_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With recency list size
    #[inline]
    #[must_use]
    pub fn with_recent_reference_limit(mut self, limit: usize) -> Self {
        self.recent_reference_limit = limit;
        self
    }

    /// With kind-affinity linking on create
    #[inline]
    #[must_use]
    pub fn with_auto_link(mut self, enabled: bool) -> Self {
        self.auto_link_on_create = enabled;
        self
    }

    /// With relationship detection in messages
    #[inline]
    #[must_use]
    pub fn with_message_relationships(mut self, enabled: bool) -> Self {
        self.detect_relationships_in_messages = enabled;
        self
    }

    /// Hydration timeout as a duration
    #[inline]
    #[must_use]
    pub fn hydration_timeout(&self) -> Duration {
        Duration::from_millis(self.hydration_timeout_ms)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            hydration_timeout_ms: 500,
            recent_reference_limit: 10,
            auto_link_on_create: true,
            detect_relationships_in_messages: true,
        }
    }
}

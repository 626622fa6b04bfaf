//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::CopyError;
use crate::stream::DEFAULT_BUFFER_SIZE;

/// Settings for a [`CopyEngine`](crate::CopyEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chunk size for stream copies and comparisons (bytes)
    pub buffer_size: usize,
    /// Prefix for handles allocated by `CopyEngine::copy`
    pub handle_prefix: String,
    /// Name of the background worker thread
    pub worker_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
            handle_prefix: "COPY-".to_string(),
            worker_name: "copy-engine".to_string(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration and return an error if it is unusable
    pub fn validate(&self) -> Result<(), CopyError> {
        if self.buffer_size == 0 {
            return Err(CopyError::InvalidConfig {
                reason: "buffer_size must be greater than zero".to_string(),
            });
        }
        if self.worker_name.is_empty() {
            return Err(CopyError::InvalidConfig {
                reason: "worker_name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

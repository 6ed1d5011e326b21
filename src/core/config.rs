use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::core::Settings;
use crate::utils::{PipelineError, PipelineResult};

/// Maximum number of images in one session
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Session tunables.
///
/// Every field has a default so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    /// Settings given to newly ingested items
    pub default_settings: Settings,
    /// Multiplier used by `EnhanceColor`
    pub enhance_boost: f32,
    /// Linear memory ceiling of the built-in engine, in bytes
    pub engine_memory_limit: usize,
    /// Build the archive automatically when a batch completes
    pub auto_export: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            default_settings: Settings::default(),
            enhance_boost: 1.5,
            engine_memory_limit: 256 * 1024 * 1024,
            auto_export: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PipelineError::config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.queue_capacity == 0 {
            return Err(PipelineError::config("queueCapacity must be at least 1"));
        }
        if !(self.enhance_boost.is_finite() && self.enhance_boost > 0.0) {
            return Err(PipelineError::config(format!(
                "Invalid enhanceBoost: {}. Must be a positive number",
                self.enhance_boost
            )));
        }
        if self.engine_memory_limit == 0 {
            return Err(PipelineError::config("engineMemoryLimit cannot be 0"));
        }
        Ok(())
    }
}

//! Engine configuration.

/// Default watched percentage at which a video counts as completed.
pub const DEFAULT_VIDEO_COMPLETION_THRESHOLD: f64 = 90.0;

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Watched percentage (inclusive) at which a video is completed.
    pub video_completion_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            video_completion_threshold: DEFAULT_VIDEO_COMPLETION_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the video completion threshold, clamped to [0,100].
    pub fn with_video_completion_threshold(mut self, threshold: f64) -> Self {
        self.video_completion_threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 100.0)
        } else {
            DEFAULT_VIDEO_COMPLETION_THRESHOLD
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.video_completion_threshold, 90.0);
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new().with_video_completion_threshold(80.0);
        assert_eq!(config.video_completion_threshold, 80.0);

        let config = EngineConfig::new().with_video_completion_threshold(250.0);
        assert_eq!(config.video_completion_threshold, 100.0);

        let config = EngineConfig::new().with_video_completion_threshold(f64::NAN);
        assert_eq!(config.video_completion_threshold, 90.0);
    }
}

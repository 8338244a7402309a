use serde::{Deserialize, Serialize};

/// Engine-level settings for the Silero model. Thresholds and debounce
/// durations live in `duet_vad::VadConfig`; this only covers what the model
/// itself requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SileroEngineConfig {
    pub sample_rate_hz: u32,
    pub chunk_size_samples: usize,
}

impl Default for SileroEngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            chunk_size_samples: 512,
        }
    }
}

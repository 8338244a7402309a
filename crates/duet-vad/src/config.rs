use serde::{Deserialize, Serialize};

pub const SAMPLE_RATE_HZ: u32 = 16_000;
pub const FRAME_SIZE_SAMPLES: usize = 512;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    /// Probability at or above which a frame counts as speech while silent.
    pub activation_threshold: f32,
    /// Probability below which a frame counts as silence while speaking.
    /// Lower than activation for hysteresis.
    pub deactivation_threshold: f32,
    pub min_speech_duration_ms: u32,
    pub min_silence_duration_ms: u32,
    pub frame_size_samples: usize,
    pub sample_rate_hz: u32,
    /// Frames below this energy skip the classifier entirely.
    pub energy_floor_dbfs: f32,
    /// Padding subtracted from the reported speech start, to keep onset
    /// audio the debounce would otherwise clip.
    pub speech_padding_ms: u32,
    pub max_speech_duration_ms: Option<u32>,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.5,
            deactivation_threshold: 0.35,
            min_speech_duration_ms: 250,
            min_silence_duration_ms: 250,
            frame_size_samples: FRAME_SIZE_SAMPLES,
            sample_rate_hz: SAMPLE_RATE_HZ,
            energy_floor_dbfs: -50.0,
            speech_padding_ms: 100,
            max_speech_duration_ms: Some(30_000),
        }
    }
}

impl VadConfig {
    pub fn clean_speech() -> Self {
        Self {
            activation_threshold: 0.4,
            deactivation_threshold: 0.25,
            min_speech_duration_ms: 200,
            energy_floor_dbfs: -60.0,
            ..Default::default()
        }
    }

    pub fn noisy_environment() -> Self {
        Self {
            activation_threshold: 0.55,
            deactivation_threshold: 0.4,
            min_speech_duration_ms: 300,
            min_silence_duration_ms: 400,
            energy_floor_dbfs: -45.0,
            ..Default::default()
        }
    }

    pub fn frame_duration_ms(&self) -> f32 {
        (self.frame_size_samples as f32 * 1000.0) / self.sample_rate_hz as f32
    }

    pub fn speech_debounce_frames(&self) -> u32 {
        (self.min_speech_duration_ms as f32 / self.frame_duration_ms()).ceil() as u32
    }

    pub fn silence_debounce_frames(&self) -> u32 {
        (self.min_silence_duration_ms as f32 / self.frame_duration_ms()).ceil() as u32
    }
}

use duet_foundation::InferenceError;
use duet_vad::VadEngine;
use voice_activity_detector::VoiceActivityDetector;

use crate::config::SileroEngineConfig;

#[derive(Copy, Clone, Default)]
struct F32Sample(f32);

impl voice_activity_detector::Sample for F32Sample {
    fn to_f32(self) -> f32 {
        self.0
    }
}

/// Silero neural VAD. The detector carries its recurrent hidden state
/// across calls; `reset` zeroes it.
pub struct SileroVad {
    detector: VoiceActivityDetector,
    config: SileroEngineConfig,
}

impl SileroVad {
    pub fn new(config: SileroEngineConfig) -> Result<Self, InferenceError> {
        let detector = VoiceActivityDetector::builder()
            .sample_rate(config.sample_rate_hz as i64)
            .chunk_size(config.chunk_size_samples)
            .build()
            .map_err(|e| InferenceError::Vad(format!("failed to create Silero VAD: {}", e)))?;
        Ok(Self { detector, config })
    }
}

impl VadEngine for SileroVad {
    fn predict(&mut self, samples: &[f32]) -> Result<f32, InferenceError> {
        if samples.len() != self.config.chunk_size_samples {
            return Err(InferenceError::Vad(format!(
                "Silero VAD requires {} samples, got {}",
                self.config.chunk_size_samples,
                samples.len()
            )));
        }
        Ok(self.detector.predict(samples.iter().map(|&s| F32Sample(s))))
    }

    fn reset(&mut self) {
        self.detector.reset();
    }

    fn required_sample_rate(&self) -> u32 {
        self.config.sample_rate_hz
    }

    fn required_frame_size(&self) -> usize {
        self.config.chunk_size_samples
    }
}

use duet_audio::energy::samples_to_dbfs;
use duet_foundation::InferenceError;

use crate::config::{FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};
use crate::engine::VadEngine;

/// Energy-threshold engine with an adaptive noise floor.
///
/// The always-available fallback when no neural engine is configured or
/// when one is failing. The floor tracks background level by exponential
/// moving average over frames classified as non-speech; probability ramps
/// from 0 at the floor-plus-margin to 1 one full margin above it.
pub struct EnergyVad {
    floor_db: f32,
    onset_margin_db: f32,
    ema_alpha: f32,
    sample_rate_hz: u32,
    frame_size: usize,
    initial_floor_db: f32,
}

impl EnergyVad {
    pub fn new() -> Self {
        Self::with_floor(-50.0)
    }

    pub fn with_floor(initial_floor_db: f32) -> Self {
        Self {
            floor_db: initial_floor_db,
            onset_margin_db: 9.0,
            ema_alpha: 0.02,
            sample_rate_hz: SAMPLE_RATE_HZ,
            frame_size: FRAME_SIZE_SAMPLES,
            initial_floor_db,
        }
    }

    pub fn current_floor(&self) -> f32 {
        self.floor_db
    }
}

impl Default for EnergyVad {
    fn default() -> Self {
        Self::new()
    }
}

impl VadEngine for EnergyVad {
    fn predict(&mut self, samples: &[f32]) -> Result<f32, InferenceError> {
        let energy_db = samples_to_dbfs(samples);
        let onset = self.floor_db + self.onset_margin_db;
        let probability = ((energy_db - onset) / self.onset_margin_db).clamp(0.0, 1.0);

        // Only adapt the floor on frames that look like background.
        if probability < 0.5 {
            self.floor_db = self.floor_db * (1.0 - self.ema_alpha) + energy_db * self.ema_alpha;
        }

        Ok(probability)
    }

    fn reset(&mut self) {
        self.floor_db = self.initial_floor_db;
    }

    fn required_sample_rate(&self) -> u32 {
        self.sample_rate_hz
    }

    fn required_frame_size(&self) -> usize {
        self.frame_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_zero_probability() {
        let mut engine = EnergyVad::new();
        let p = engine.predict(&vec![0.0; 512]).unwrap();
        assert_eq!(p, 0.0);
    }

    #[test]
    fn loud_tone_has_high_probability() {
        let mut engine = EnergyVad::new();
        let tone: Vec<f32> = (0..512)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16_000.0).sin() * 0.5)
            .collect();
        let p = engine.predict(&tone).unwrap();
        assert!(p > 0.9, "got {}", p);
    }

    #[test]
    fn floor_adapts_to_background_noise() {
        let mut engine = EnergyVad::new();
        let initial = engine.current_floor();
        let hiss = vec![0.001_f32; 512];
        for _ in 0..100 {
            engine.predict(&hiss).unwrap();
        }
        assert_ne!(initial, engine.current_floor());
    }

    #[test]
    fn reset_restores_initial_floor() {
        let mut engine = EnergyVad::with_floor(-55.0);
        engine.predict(&vec![0.01; 512]).unwrap();
        engine.reset();
        assert_eq!(engine.current_floor(), -55.0);
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::energy::samples_to_dbfs;
use crate::resampler;

/// One fixed-size slice of captured or synthesized audio, the currency every
/// pipeline stage trades in.
///
/// Samples are normalized f32 in [-1.0, 1.0]. A frame is immutable once
/// constructed; transformations (resampling, downmixing) produce a new frame
/// that keeps the source sequence number.
#[derive(Clone)]
pub struct AudioFrame {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Monotonic per-stream sequence number, assigned by the input boundary.
    pub sequence: u64,
    pub timestamp: Instant,
    pub duration: Duration,
    /// Speech probability, set by the VAD stage.
    pub vad_probability: Option<f32>,
    /// Whether this frame fell inside an active speech segment.
    pub is_speech: bool,
    /// RMS energy in dBFS, computed at construction.
    pub energy_db: f32,
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("samples_len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("sequence", &self.sequence)
            .field("duration", &self.duration)
            .field("vad_probability", &self.vad_probability)
            .field("is_speech", &self.is_speech)
            .field("energy_db", &self.energy_db)
            .finish()
    }
}

const PCM16_NORMALIZE: f32 = 32768.0;
const PCM16_SCALE: f32 = 32767.0;

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16, sequence: u64) -> Self {
        let duration = Duration::from_secs_f64(
            samples.len() as f64 / (sample_rate as f64 * channels.max(1) as f64),
        );
        let energy_db = samples_to_dbfs(&samples);
        Self {
            samples: samples.into(),
            sample_rate,
            channels,
            sequence,
            timestamp: Instant::now(),
            duration,
            vad_probability: None,
            is_speech: false,
            energy_db,
        }
    }

    pub fn with_timestamp(
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        sequence: u64,
        timestamp: Instant,
    ) -> Self {
        let mut frame = Self::new(samples, sample_rate, channels, sequence);
        frame.timestamp = timestamp;
        frame
    }

    /// Decode little-endian PCM16 bytes into a normalized frame.
    pub fn from_pcm16(bytes: &[u8], sample_rate: u32, channels: u16, sequence: u64) -> Self {
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| {
                let sample = i16::from_le_bytes([pair[0], pair[1]]);
                sample as f32 / PCM16_NORMALIZE
            })
            .collect();
        Self::new(samples, sample_rate, channels, sequence)
    }

    /// Encode to little-endian PCM16 bytes, clamping out-of-range samples.
    pub fn to_pcm16(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|&sample| {
                let pcm = (sample.clamp(-1.0, 1.0) * PCM16_SCALE) as i16;
                pcm.to_le_bytes()
            })
            .collect()
    }

    /// Produce a copy carrying the VAD stage's annotations.
    pub fn annotated(&self, probability: f32, is_speech: bool) -> Self {
        let mut frame = self.clone();
        frame.vad_probability = Some(probability);
        frame.is_speech = is_speech;
        frame
    }

    /// Resample to a new rate, producing a new frame. FFT-based for normal
    /// frames, linear interpolation for buffers too short for the FFT path.
    pub fn resample(&self, target_rate: u32) -> Self {
        if self.sample_rate == target_rate {
            return self.clone();
        }
        let resampled = resampler::resample(&self.samples, self.sample_rate, target_rate);
        let mut frame = Self::new(resampled, target_rate, self.channels, self.sequence);
        frame.timestamp = self.timestamp;
        frame
    }

    /// Downmix interleaved stereo to mono by averaging channel pairs.
    pub fn to_mono(&self) -> Self {
        if self.channels <= 1 {
            return self.clone();
        }
        let step = self.channels as usize;
        let mono: Vec<f32> = self
            .samples
            .chunks_exact(step)
            .map(|group| group.iter().sum::<f32>() / step as f32)
            .collect();
        let mut frame = Self::new(mono, self.sample_rate, 1, self.sequence);
        frame.timestamp = self.timestamp;
        frame
    }

    /// Split into chunks of at most `chunk_samples`, sequence numbers
    /// continuing from this frame's.
    pub fn split(&self, chunk_samples: usize) -> Vec<AudioFrame> {
        let mut seq = self.sequence;
        self.samples
            .chunks(chunk_samples)
            .map(|chunk| {
                let frame = AudioFrame::new(chunk.to_vec(), self.sample_rate, self.channels, seq);
                seq += 1;
                frame
            })
            .collect()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    pub fn is_below_floor(&self, threshold_db: f32) -> bool {
        self.energy_db < threshold_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm16_round_trip_preserves_sign() {
        let bytes: Vec<u8> = vec![0x00, 0x40, 0x00, 0xC0];
        let frame = AudioFrame::from_pcm16(&bytes, 16_000, 1, 0);
        assert_eq!(frame.samples.len(), 2);
        assert!(frame.samples[0] > 0.0);
        assert!(frame.samples[1] < 0.0);

        let back = frame.to_pcm16();
        assert_eq!(back.len(), 4);
    }

    #[test]
    fn to_pcm16_clamps_out_of_range() {
        let frame = AudioFrame::new(vec![2.0, -2.0], 16_000, 1, 0);
        let bytes = frame.to_pcm16();
        let first = i16::from_le_bytes([bytes[0], bytes[1]]);
        let second = i16::from_le_bytes([bytes[2], bytes[3]]);
        assert_eq!(first, i16::MAX);
        assert_eq!(second, -i16::MAX);
    }

    #[test]
    fn duration_matches_sample_count() {
        let frame = AudioFrame::new(vec![0.0; 160], 16_000, 1, 0);
        assert_eq!(frame.duration_ms(), 10);
    }

    #[test]
    fn resample_halves_length() {
        let frame = AudioFrame::new(vec![0.1; 1600], 16_000, 1, 7);
        let down = frame.resample(8_000);
        assert_eq!(down.sample_rate, 8_000);
        assert_eq!(down.sequence, 7);
        let expected = 800;
        let delta = (down.samples.len() as i64 - expected).unsigned_abs();
        assert!(delta <= 16, "got {} samples", down.samples.len());
    }

    #[test]
    fn short_frame_resamples_via_linear_path() {
        let frame = AudioFrame::new(vec![0.5; 32], 16_000, 1, 0);
        let up = frame.resample(48_000);
        assert_eq!(up.sample_rate, 48_000);
        assert!(!up.samples.is_empty());
    }

    #[test]
    fn stereo_downmix_averages() {
        let frame = AudioFrame::new(vec![1.0, 0.0, 0.5, 0.5], 16_000, 2, 0);
        let mono = frame.to_mono();
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples.len(), 2);
        assert!((mono.samples[0] - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn annotation_does_not_touch_samples() {
        let frame = AudioFrame::new(vec![0.1; 160], 16_000, 1, 3);
        let annotated = frame.annotated(0.9, true);
        assert!(annotated.is_speech);
        assert_eq!(annotated.vad_probability, Some(0.9));
        assert!(Arc::ptr_eq(&frame.samples, &annotated.samples));
    }
}

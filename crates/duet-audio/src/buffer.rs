use std::time::Duration;

use crate::frame::AudioFrame;

/// Rolling mono sample store bounded by a maximum duration.
///
/// Frames pushed at a different rate or channel layout are converted on the
/// way in. When the bound is exceeded, the oldest samples are trimmed, so
/// the buffer always holds the most recent audio.
#[derive(Debug)]
pub struct RollingBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    max_samples: usize,
    /// Samples trimmed or drained from the front since creation, for
    /// computing absolute time offsets of what remains.
    consumed: u64,
}

impl RollingBuffer {
    pub fn new(sample_rate: u32, max_duration: Duration) -> Self {
        let max_samples = (sample_rate as f64 * max_duration.as_secs_f64()) as usize;
        Self {
            samples: Vec::with_capacity(max_samples),
            sample_rate,
            max_samples,
            consumed: 0,
        }
    }

    pub fn push(&mut self, frame: &AudioFrame) {
        let frame = if frame.sample_rate != self.sample_rate {
            frame.resample(self.sample_rate)
        } else {
            frame.clone()
        };
        let frame = if frame.channels > 1 {
            frame.to_mono()
        } else {
            frame
        };

        self.samples.extend(frame.samples.iter());

        if self.samples.len() > self.max_samples {
            let excess = self.samples.len() - self.max_samples;
            self.samples.drain(0..excess);
            self.consumed += excess as u64;
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn has_duration(&self, duration: Duration) -> bool {
        self.duration() >= duration
    }

    /// Remove and return up to `count` samples from the front.
    pub fn drain(&mut self, count: usize) -> Vec<f32> {
        let count = count.min(self.samples.len());
        self.consumed += count as u64;
        self.samples.drain(0..count).collect()
    }

    /// Millisecond offset from stream start of the oldest retained sample.
    pub fn start_offset_ms(&self) -> u64 {
        self.consumed * 1000 / self.sample_rate as u64
    }

    pub fn clear(&mut self) {
        self.consumed += self.samples.len() as u64;
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: usize, value: f32) -> AudioFrame {
        AudioFrame::new(vec![value; samples], 16_000, 1, 0)
    }

    #[test]
    fn accumulates_frames() {
        let mut buffer = RollingBuffer::new(16_000, Duration::from_secs(1));
        buffer.push(&frame(160, 0.1));
        buffer.push(&frame(160, 0.2));
        assert_eq!(buffer.len(), 320);
        assert!(buffer.has_duration(Duration::from_millis(20)));
    }

    #[test]
    fn trims_oldest_when_full() {
        let mut buffer = RollingBuffer::new(16_000, Duration::from_millis(20));
        buffer.push(&frame(160, 0.1));
        buffer.push(&frame(160, 0.2));
        buffer.push(&frame(160, 0.3));
        assert_eq!(buffer.len(), 320);
        // Oldest frame was trimmed, newest value survives at the back.
        assert!((buffer.samples()[319] - 0.3).abs() < f32::EPSILON);
        assert_eq!(buffer.start_offset_ms(), 10);
    }

    #[test]
    fn drain_advances_offset() {
        let mut buffer = RollingBuffer::new(16_000, Duration::from_secs(1));
        buffer.push(&frame(320, 0.1));
        let drained = buffer.drain(160);
        assert_eq!(drained.len(), 160);
        assert_eq!(buffer.len(), 160);
        assert_eq!(buffer.start_offset_ms(), 10);
    }

    #[test]
    fn mismatched_rate_is_converted() {
        let mut buffer = RollingBuffer::new(16_000, Duration::from_secs(1));
        let hi_rate = AudioFrame::new(vec![0.1; 480], 48_000, 1, 0);
        buffer.push(&hi_rate);
        // 10ms of 48k audio becomes ~160 samples at 16k.
        assert!(buffer.len() >= 140 && buffer.len() <= 180, "got {}", buffer.len());
    }
}

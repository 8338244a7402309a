use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Output sample rate. Backends at other rates are resampled.
    pub sample_rate_hz: u32,
    /// Fixed duration of emitted audio frames.
    pub frame_ms: u64,
    /// Overlap blended across consecutive sentence outputs.
    pub crossfade_ms: u64,
    /// Queued normal-priority sentences beyond which the newest is dropped.
    pub max_queue: usize,
    /// First sentence may be cut early at a word boundary once this many
    /// chars have accumulated, trading a mid-sentence join for latency.
    pub min_chars_first_sentence: usize,
    /// Buffered text beyond which a chunk is force-flushed at a word
    /// boundary even without a sentence terminator.
    pub max_buffer_chars: usize,
    /// Sentence-terminal characters, including danda and CJK marks.
    pub terminators: Vec<char>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            frame_ms: 20,
            crossfade_ms: 30,
            max_queue: 8,
            min_chars_first_sentence: 15,
            max_buffer_chars: 300,
            terminators: vec!['.', '!', '?', '।', '॥', '。', '！', '？'],
        }
    }
}

impl TtsConfig {
    pub fn frame_samples(&self) -> usize {
        (self.sample_rate_hz as u64 * self.frame_ms / 1000) as usize
    }

    pub fn crossfade_samples(&self) -> usize {
        (self.sample_rate_hz as u64 * self.crossfade_ms / 1000) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_and_crossfade_sizes() {
        let config = TtsConfig::default();
        assert_eq!(config.frame_samples(), 320);
        assert_eq!(config.crossfade_samples(), 480);
    }
}

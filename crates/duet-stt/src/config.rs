use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    pub sample_rate_hz: u32,
    /// New audio accumulated before another decode pass runs.
    pub chunk_ms: u64,
    /// Rolling buffer bound; older consumed audio is trimmed past this.
    pub max_buffer_secs: u64,
    /// Decodes a prefix must survive unchanged before it is emitted.
    pub stability_window: usize,
    /// Order of the repetition blocker.
    pub ngram_order: usize,
    /// Non-improving candidates tolerated before hypothesis scanning stops.
    pub patience: usize,
    /// Length-normalization exponent for hypothesis scoring.
    pub length_penalty: f32,
    /// Regexes for audio-unsupported stock phrases, per language.
    pub hallucination_patterns: Vec<String>,
    pub language: Option<String>,
    /// Sentence-terminal characters that allow promoting a stable prefix
    /// to a final mid-utterance.
    pub terminators: Vec<char>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            chunk_ms: 100,
            max_buffer_secs: 30,
            stability_window: 5,
            ngram_order: 3,
            patience: 3,
            length_penalty: 0.6,
            hallucination_patterns: Self::english_hallucination_patterns(),
            language: Some("en".into()),
            terminators: vec!['.', '!', '?', '।', '॥', '。'],
        }
    }
}

impl SttConfig {
    /// Stock completions a speech decoder produces on silence or noise,
    /// learned from caption-heavy training data.
    pub fn english_hallucination_patterns() -> Vec<String> {
        vec![
            r"(?i)thank you for watching".into(),
            r"(?i)thanks for watching".into(),
            r"(?i)please (like and )?subscribe".into(),
            r"(?i)subtitles? (by|provided by) \w+".into(),
            r"(?i)see you (in the )?next (video|time)".into(),
            r"(?i)www\.[a-z0-9-]+\.[a-z]{2,}".into(),
        ]
    }

    pub fn chunk_samples(&self) -> usize {
        (self.sample_rate_hz as u64 * self.chunk_ms / 1000) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_is_100ms() {
        let config = SttConfig::default();
        assert_eq!(config.chunk_samples(), 1_600);
    }
}

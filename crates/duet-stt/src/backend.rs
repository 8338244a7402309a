use duet_foundation::InferenceError;

/// One decoded token with its score. Blank covers silence and padding
/// tokens the model uses internally.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub text: String,
    pub log_prob: f32,
    pub is_blank: bool,
}

impl DecodedToken {
    pub fn word(text: impl Into<String>, log_prob: f32) -> Self {
        Self {
            text: text.into(),
            log_prob,
            is_blank: false,
        }
    }

    pub fn blank() -> Self {
        Self {
            text: String::new(),
            log_prob: 0.0,
            is_blank: true,
        }
    }
}

/// One candidate transcription of the audio, ordered tokens plus the
/// summed log probability.
#[derive(Debug, Clone)]
pub struct Hypothesis {
    pub tokens: Vec<DecodedToken>,
    pub log_prob: f32,
}

impl Hypothesis {
    pub fn new(tokens: Vec<DecodedToken>) -> Self {
        let log_prob = tokens.iter().filter(|t| !t.is_blank).map(|t| t.log_prob).sum();
        Self { tokens, log_prob }
    }

    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .filter(|t| !t.is_blank)
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn word_count(&self) -> usize {
        self.tokens.iter().filter(|t| !t.is_blank).count()
    }
}

/// Decodes utterance audio into ranked candidate hypotheses.
///
/// Implementations are stateless and shareable across sessions; all
/// per-utterance state lives in [`crate::StreamingRecognizer`]. Candidates
/// should come best-first by the backend's own ranking.
pub trait DecoderBackend: Send + Sync {
    fn decode(&self, audio: &[f32], sample_rate: u32)
        -> Result<Vec<Hypothesis>, InferenceError>;
}

use async_trait::async_trait;

use duet_foundation::InferenceError;

/// Per-sentence synthesis options.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    /// Override voice for this sentence.
    pub voice: Option<String>,
    /// Speaking rate override, words per minute.
    pub speech_rate: Option<u32>,
    /// Urgent interjection: bypasses the normal queue and is never dropped
    /// under backpressure.
    pub high_priority: bool,
}

impl SynthesisOptions {
    pub fn priority() -> Self {
        Self {
            high_priority: true,
            ..Default::default()
        }
    }
}

/// Synthesizes one sentence of text to mono f32 audio at
/// [`sample_rate`](Self::sample_rate). Implementations are stateless and
/// shared across sessions.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    fn name(&self) -> &str {
        "synthesis"
    }

    fn sample_rate(&self) -> u32;

    async fn synthesize(
        &self,
        text: &str,
        options: &SynthesisOptions,
    ) -> Result<Vec<f32>, InferenceError>;
}

use async_trait::async_trait;
use tokio::sync::mpsc;

use duet_foundation::InferenceError;

/// Which model produced a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Slow,
}

/// One streamed piece of the response, usually a word or sub-word token.
#[derive(Debug, Clone)]
pub struct TokenChunk {
    pub text: String,
    pub tier: ModelTier,
    pub index: u32,
}

/// Prompt for one response. `prefix` carries tokens already emitted to the
/// caller, so a model taking over mid-stream continues after them instead
/// of restarting.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub transcript: String,
    pub history: Vec<String>,
    pub prefix: Vec<String>,
}

impl GenerationRequest {
    pub fn new(transcript: impl Into<String>, history: Vec<String>) -> Self {
        Self {
            transcript: transcript.into(),
            history,
            prefix: Vec::new(),
        }
    }

    pub fn with_prefix(&self, prefix: Vec<String>) -> Self {
        Self {
            transcript: self.transcript.clone(),
            history: self.history.clone(),
            prefix,
        }
    }
}

/// A text generation backend. Handles are stateless and shared across
/// sessions; per-request state lives in the strategy drivers.
///
/// `generate` streams tokens into `tx` until the response is complete or
/// the receiver is dropped; dropping the receiver is the cancellation
/// signal. `draft` and `verify` support the draft-verify strategy and
/// single-token fallback decoding.
#[async_trait]
pub trait ResponseModel: Send + Sync {
    fn name(&self) -> &str {
        "model"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<(), InferenceError>;

    /// Propose up to `span` tokens continuing `request.prefix`. An empty
    /// vec means the response is complete.
    async fn draft(
        &self,
        request: &GenerationRequest,
        span: usize,
    ) -> Result<Vec<String>, InferenceError>;

    /// How many leading tokens of `draft` this model accepts as its own
    /// continuation of `request.prefix`.
    async fn verify(
        &self,
        request: &GenerationRequest,
        draft: &[String],
    ) -> Result<usize, InferenceError>;
}

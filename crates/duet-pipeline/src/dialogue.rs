use async_trait::async_trait;

use duet_foundation::PipelineError;
use duet_respond::GenerationRequest;
use duet_stt::TranscriptResult;

/// One completed user turn handed to the dialogue collaborator.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub text: String,
    /// Turn-detector confidence that the user was done.
    pub confidence: f32,
    /// The finalized recognition result, when one was produced.
    pub transcript: Option<TranscriptResult>,
    /// Prior user turns, oldest first.
    pub history: Vec<String>,
}

/// Boundary to the external dialogue logic. The pipeline never writes
/// response content itself: it hands over the finished turn and receives
/// the prompt for the response models.
#[async_trait]
pub trait DialogueHandle: Send + Sync {
    async fn respond(&self, turn: &ConversationTurn) -> Result<GenerationRequest, PipelineError>;
}

/// Word with approximate time span inside the utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct WordSpan {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub confidence: f32,
}

/// One recognition result. Partials with the same `utterance_id` supersede
/// earlier partials; a final closes the utterance and is never revised.
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub utterance_id: u64,
    pub text: String,
    pub is_final: bool,
    pub confidence: f32,
    /// Offsets in ms from stream start.
    pub start_ms: u64,
    pub end_ms: u64,
    pub language: Option<String>,
    pub words: Vec<WordSpan>,
}

#[derive(Debug, Clone, Default)]
pub struct SttMetrics {
    pub chunks_decoded: u64,
    pub decode_retries: u64,
    pub decode_failures: u64,
    pub suppressed_tokens: u64,
    pub blocked_hypotheses: u64,
    pub hallucinations_stripped: u64,
    pub partials_emitted: u64,
    pub finals_emitted: u64,
    pub patience_stops: u64,
}

use duet_foundation::InferenceError;

/// A speech-probability engine. Implementations may carry recurrent state
/// across calls; `reset` must clear it.
///
/// Engines are per-session and single-owner. They classify; debouncing and
/// event emission belong to [`crate::VadStateMachine`].
pub trait VadEngine: Send {
    /// Probability in [0.0, 1.0] that `samples` contain speech.
    fn predict(&mut self, samples: &[f32]) -> Result<f32, InferenceError>;

    fn reset(&mut self);

    fn required_sample_rate(&self) -> u32;

    fn required_frame_size(&self) -> usize;
}

//! Streaming text-to-speech with sentence-level chunking.
//!
//! Tokens accumulate until a sentence boundary, each sentence is synthesized
//! while later text is still arriving, and consecutive sentences are joined
//! with a short crossfade so playback has no audible seams. A priority lane
//! carries short interjections past the normal queue.

pub mod backend;
pub mod chunker;
pub mod config;
pub mod crossfade;
pub mod synthesizer;

pub use backend::{SynthesisBackend, SynthesisOptions};
pub use chunker::SentenceChunker;
pub use config::TtsConfig;
pub use synthesizer::{StreamingSynthesizer, TtsMetrics};

pub mod config;
#[cfg(feature = "silero")]
pub mod engine;

pub use config::SileroEngineConfig;
#[cfg(feature = "silero")]
pub use engine::SileroVad;

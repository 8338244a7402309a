pub mod buffer;
pub mod energy;
pub mod frame;
pub mod resampler;

pub use buffer::RollingBuffer;
pub use energy::{rms, rms_to_dbfs, samples_to_dbfs, SILENCE_FLOOR_DBFS};
pub use frame::AudioFrame;

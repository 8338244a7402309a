//! Barge-in detection.
//!
//! Watches the input stream while agent audio is playing and decides when
//! the user is genuinely interrupting, as opposed to echo, a cough, or a
//! backchannel. Deliberately stricter than turn-taking VAD: higher
//! probability threshold, an energy floor, a minimum sustained duration,
//! a grace period after playback starts, and a cooldown after each event.

pub mod config;
pub mod detector;

pub use config::BargeInConfig;
pub use detector::{BargeInAction, BargeInDetector, BargeInEvent, InterruptState};
